use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{
    cookies::set_token_cookies,
    types::{LoginRequest, SessionInfo},
};
use crate::{
    api::response::{ApiMessage, ApiResponse, json_body},
    auth::AuthService,
    error::ServiceError,
    owners::validation::check_required,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created; tokens set as cookies", body = ApiResponse<SessionInfo>),
        (status = 400, description = "Missing NIC or password", body = ApiMessage),
        (status = 401, description = "Invalid credentials", body = ApiMessage),
    ),
    tag = "auth"
)]
pub async fn login(
    auth: Extension<Arc<AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = json_body(payload)?;

    let mut errors = Vec::new();
    check_required(&mut errors, "NIC", &request.nic);
    check_required(&mut errors, "Password", &request.password);
    if !errors.is_empty() {
        return Err(ServiceError::validation(errors));
    }

    let pair = auth.login(&request.nic, &request.password).await?;

    let mut headers = HeaderMap::new();
    set_token_cookies(&mut headers, auth.config(), &pair)
        .map_err(|err| ServiceError::Internal(err.into()))?;

    Ok((
        StatusCode::OK,
        headers,
        Json(ApiResponse::ok("Login successful", SessionInfo::from(&pair))),
    )
        .into_response())
}
