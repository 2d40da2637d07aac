use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::cookies::{REFRESH_COOKIE, clear_token_cookies, read_cookie};
use crate::{
    api::response::ApiMessage,
    auth::{AuthService, Principal},
    error::ServiceError,
};

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session closed and cookies cleared", body = ApiMessage),
        (status = 401, description = "Authentication required", body = ApiMessage),
    ),
    tag = "auth"
)]
pub async fn logout(
    principal: Principal,
    headers: HeaderMap,
    auth: Extension<Arc<AuthService>>,
) -> Result<Response, ServiceError> {
    // The refresh cookie is scoped to the refresh path and may be absent here;
    // that session then simply expires.
    if let Some(token) = read_cookie(&headers, REFRESH_COOKIE) {
        match auth.logout(&token).await {
            Ok(()) => debug!(owner_id = %principal.owner_id, "Session closed"),
            Err(ServiceError::InvalidRefreshToken) => {
                debug!(owner_id = %principal.owner_id, "Logout with unknown refresh token");
            }
            Err(err) => return Err(err),
        }
    }

    // Always clear the cookies, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    clear_token_cookies(&mut response_headers, auth.config())
        .map_err(|err| ServiceError::Internal(err.into()))?;

    Ok((
        StatusCode::OK,
        response_headers,
        Json(ApiMessage::ok("Logged out successfully")),
    )
        .into_response())
}
