//! Transparent token renewal.
//!
//! Flow Overview:
//! 1) Peek at the `accessToken` cookie expiry without verifying it.
//! 2) If it expires within the refresh threshold and a `refreshToken` cookie
//!    is present, rotate the session through [`AuthService::refresh`].
//! 3) On success the request continues with the new cookies and the response
//!    carries them, unless the handler already set its own.
//!
//! Any failure along the way is logged and the request passes through
//! unchanged; the downstream handler decides the status code.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use super::cookies::{
    ACCESS_COOKIE, REFRESH_COOKIE, read_cookie, replace_cookies, set_token_cookies, sets_cookie,
};
use crate::auth::{AuthService, TokenPair, token::peek_expiry};

pub async fn refresh_tokens(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let renewed = renew_if_due(&auth, request.headers()).await;

    if let Some(pair) = &renewed {
        replace_cookies(
            request.headers_mut(),
            &[
                (ACCESS_COOKIE, pair.access.token.as_str()),
                (REFRESH_COOKIE, pair.refresh.token.as_str()),
            ],
        );
    }

    let mut response = next.run(request).await;

    if let Some(pair) = renewed
        && !sets_cookie(response.headers(), ACCESS_COOKIE)
        && !sets_cookie(response.headers(), REFRESH_COOKIE)
        && let Err(err) = set_token_cookies(response.headers_mut(), auth.config(), &pair)
    {
        warn!("Failed to attach renewed cookies: {err}");
    }

    response
}

async fn renew_if_due(auth: &AuthService, headers: &HeaderMap) -> Option<TokenPair> {
    let access = read_cookie(headers, ACCESS_COOKIE)?;
    let expires_at = peek_expiry(&access)?;
    if expires_at > Utc::now() + auth.config().refresh_threshold() {
        return None;
    }

    let refresh = read_cookie(headers, REFRESH_COOKIE)?;
    match auth.refresh(&refresh).await {
        Ok(pair) => {
            debug!(owner_id = %pair.owner_id, "Access token renewed in-flight");
            Some(pair)
        }
        Err(err) => {
            debug!("In-flight token renewal skipped: {err}");
            None
        }
    }
}
