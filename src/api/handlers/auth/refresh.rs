use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{
    cookies::{REFRESH_COOKIE, read_cookie, set_token_cookies},
    types::SessionInfo,
};
use crate::{
    api::response::{ApiMessage, ApiResponse},
    auth::AuthService,
    error::ServiceError,
};

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Refresh token rotated; new tokens set as cookies", body = ApiResponse<SessionInfo>),
        (status = 401, description = "Missing, invalid or expired refresh token", body = ApiMessage),
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    auth: Extension<Arc<AuthService>>,
) -> Result<Response, ServiceError> {
    let token =
        read_cookie(&headers, REFRESH_COOKIE).ok_or(ServiceError::InvalidOrExpiredRefreshToken)?;

    let pair = auth.refresh(&token).await?;

    let mut response_headers = HeaderMap::new();
    set_token_cookies(&mut response_headers, auth.config(), &pair)
        .map_err(|err| ServiceError::Internal(err.into()))?;

    Ok((
        StatusCode::OK,
        response_headers,
        Json(ApiResponse::ok(
            "Token refreshed successfully",
            SessionInfo::from(&pair),
        )),
    )
        .into_response())
}
