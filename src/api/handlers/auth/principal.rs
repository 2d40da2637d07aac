//! Principal extraction for protected routes.
//!
//! The access token is read from the `accessToken` cookie first, then from a
//! `Bearer` authorization header. Missing or invalid tokens reject with 401.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use super::cookies::{ACCESS_COOKIE, extract_bearer_token, read_cookie};
use crate::{
    auth::{AuthService, Principal},
    error::ServiceError,
};

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("Auth service not configured")))?;

        let token = read_cookie(&parts.headers, ACCESS_COOKIE)
            .or_else(|| extract_bearer_token(&parts.headers))
            .ok_or(ServiceError::Unauthenticated)?;

        auth.authenticate(&token)
    }
}
