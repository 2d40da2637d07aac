//! Token cookies and request credential extraction.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, InvalidHeaderValue, SET_COOKIE},
};
use chrono::{DateTime, Utc};

use crate::auth::{AuthConfig, TokenPair};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn token_cookie(
    name: &str,
    value: &str,
    path: &str,
    expires_at: DateTime<Utc>,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}={value}; Path={path}; Expires={}; HttpOnly; Secure; SameSite=None",
        http_date(expires_at)
    ))
}

fn clear_cookie(name: &str, path: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}=; Path={path}; Expires={EXPIRED}; Max-Age=0; HttpOnly; Secure; SameSite=None"
    ))
}

/// Append `Set-Cookie` headers for both tokens of a freshly issued pair.
///
/// # Errors
/// Fails only if a token or path contains bytes not allowed in a header.
pub fn set_token_cookies(
    headers: &mut HeaderMap,
    config: &AuthConfig,
    pair: &TokenPair,
) -> Result<(), InvalidHeaderValue> {
    headers.append(
        SET_COOKIE,
        token_cookie(
            ACCESS_COOKIE,
            &pair.access.token,
            config.access_cookie_path(),
            pair.access.expires_at,
        )?,
    );
    headers.append(
        SET_COOKIE,
        token_cookie(
            REFRESH_COOKIE,
            &pair.refresh.token,
            config.refresh_cookie_path(),
            pair.refresh.expires_at,
        )?,
    );
    Ok(())
}

/// Append `Set-Cookie` headers that expire both token cookies.
///
/// # Errors
/// Fails only if a configured path is not a valid header value.
pub fn clear_token_cookies(
    headers: &mut HeaderMap,
    config: &AuthConfig,
) -> Result<(), InvalidHeaderValue> {
    headers.append(
        SET_COOKIE,
        clear_cookie(ACCESS_COOKIE, config.access_cookie_path())?,
    );
    headers.append(
        SET_COOKIE,
        clear_cookie(REFRESH_COOKIE, config.refresh_cookie_path())?,
    );
    Ok(())
}

/// Value of the named request cookie, if present and non-empty.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Rebuild the request `Cookie` header with the given cookies replaced.
///
/// Cookies not named in `updates` are kept in their original order.
pub fn replace_cookies(headers: &mut HeaderMap, updates: &[(&str, &str)]) {
    let mut pairs: Vec<String> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(key, _)| key).trim();
            !updates.iter().any(|(name, _)| *name == key)
        })
        .map(str::to_string)
        .collect();
    pairs.extend(updates.iter().map(|(name, value)| format!("{name}={value}")));

    if let Ok(value) = HeaderValue::from_str(&pairs.join("; ")) {
        headers.remove(COOKIE);
        headers.insert(COOKIE, value);
    }
}

/// Whether the response already sets the named cookie.
pub fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    let prefix = format!("{name}=");
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.trim_start().starts_with(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IssuedToken;
    use chrono::TimeZone;
    use secrecy::SecretString;
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig::new(SecretString::from("0123456789abcdef0123456789abcdef"))
    }

    fn pair() -> TokenPair {
        let at = Utc.with_ymd_and_hms(2030, 5, 6, 7, 8, 9).single();
        let expires_at = at.unwrap_or_else(Utc::now);
        TokenPair {
            owner_id: Uuid::new_v4(),
            user_type: "EVOwner".to_string(),
            access: IssuedToken {
                token: "access-value".to_string(),
                expires_at,
            },
            refresh: IssuedToken {
                token: "refresh-value".to_string(),
                expires_at,
            },
        }
    }

    #[test]
    fn token_cookies_carry_attributes() -> anyhow::Result<()> {
        let mut headers = HeaderMap::new();
        set_token_cookies(&mut headers, &config(), &pair())?;
        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(
            cookies[0],
            "accessToken=access-value; Path=/api; Expires=Mon, 06 May 2030 07:08:09 GMT; HttpOnly; Secure; SameSite=None"
        );
        assert!(cookies[1].starts_with("refreshToken=refresh-value; Path=/api/auth/refresh;"));
        Ok(())
    }

    #[test]
    fn cleared_cookies_expire_immediately() -> anyhow::Result<()> {
        let mut headers = HeaderMap::new();
        clear_token_cookies(&mut headers, &config())?;
        for value in headers.get_all(SET_COOKIE) {
            let value = value.to_str()?;
            assert!(value.contains("Max-Age=0"));
            assert!(value.contains(EXPIRED));
        }
        assert!(sets_cookie(&headers, ACCESS_COOKIE));
        assert!(sets_cookie(&headers, REFRESH_COOKIE));
        Ok(())
    }

    #[test]
    fn reads_cookie_and_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=abc; refreshToken="),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(read_cookie(&headers, ACCESS_COOKIE).as_deref(), Some("abc"));
        assert_eq!(read_cookie(&headers, REFRESH_COOKIE), None);
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn replace_keeps_unrelated_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=old; refreshToken=old-r"),
        );
        replace_cookies(
            &mut headers,
            &[(ACCESS_COOKIE, "new"), (REFRESH_COOKIE, "new-r")],
        );
        assert_eq!(
            headers.get(COOKIE).and_then(|value| value.to_str().ok()),
            Some("theme=dark; accessToken=new; refreshToken=new-r")
        );
    }
}
