//! Access and refresh token issuance.
//!
//! Access tokens are HS256 JWTs verified statelessly on every request.
//! Refresh tokens are 32 random bytes (base64url) whose authority comes only
//! from a matching session record; the store sees their SHA-256 digest.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use rand::{RngCore, rngs::OsRng};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashSet, fmt};
use uuid::Uuid;

use super::{config::AuthConfig, role::Role};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign access token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("access token expired")]
    Expired,
    #[error("access token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("failed to generate refresh token: {0}")]
    Entropy(#[source] rand::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub role: Role,
    pub user_type: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nic: Option<String>,
}

#[derive(Deserialize)]
struct ExpiryOnly {
    exp: i64,
}

/// A freshly minted credential and its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    config: AuthConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let secret = config.signing_secret().expose_secret().as_bytes();
        let encoding = EncodingKey::from_secret(secret);
        let decoding = DecodingKey::from_secret(secret);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer()]);
        validation.set_audience(&[config.audience()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Self {
            config,
            encoding,
            decoding,
            validation,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Sign an access token for `owner_id` expiring after the configured lifetime.
    ///
    /// # Errors
    /// Returns [`TokenError::Sign`] if encoding fails.
    pub fn issue_access_token(
        &self,
        owner_id: Uuid,
        user_type: &str,
        role: &Role,
        nic: Option<&str>,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.config.access_token_lifetime();
        let claims = AccessClaims {
            sub: owner_id.to_string(),
            role: role.clone(),
            user_type: user_type.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer().to_string(),
            aud: self.config.audience().to_string(),
            nic: nic.map(str::to_string),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Sign)?;

        // `exp` has second precision; report exactly what the token carries.
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at);
        Ok(IssuedToken { token, expires_at })
    }

    /// Generate an opaque refresh token expiring after the configured lifetime.
    ///
    /// # Errors
    /// Returns [`TokenError::Entropy`] if the OS RNG fails.
    pub fn issue_refresh_token(&self) -> Result<IssuedToken, TokenError> {
        let mut bytes = [0u8; 32];
        OsRng.try_fill_bytes(&mut bytes).map_err(TokenError::Entropy)?;
        Ok(IssuedToken {
            token: URL_SAFE_NO_PAD.encode(bytes),
            expires_at: Utc::now() + self.config.refresh_token_lifetime(),
        })
    }

    /// Verify signature, expiry, issuer and audience.
    ///
    /// # Errors
    /// [`TokenError::Expired`] for expired tokens, [`TokenError::Invalid`] otherwise.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(err),
            })
    }
}

/// Read `exp` without checking the signature.
///
/// Only for deciding whether to attempt a refresh; never for authorization.
#[must_use]
pub fn peek_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let data =
        jsonwebtoken::decode::<ExpiryOnly>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}

/// SHA-256 digest of a raw refresh token; the only form the store keeps.
#[must_use]
pub fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use secrecy::SecretString;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(AuthConfig::new(SecretString::from(
            "0123456789abcdef0123456789abcdef",
        )))
    }

    #[test]
    fn access_token_round_trip() -> anyhow::Result<()> {
        let issuer = issuer();
        let owner_id = Uuid::new_v4();
        let issued =
            issuer.issue_access_token(owner_id, "EVOwner", &Role::ev_owner(), Some("123456789V"))?;

        let claims = issuer.verify_access_token(&issued.token)?;
        assert_eq!(claims.sub, owner_id.to_string());
        assert_eq!(claims.role, Role::ev_owner());
        assert_eq!(claims.user_type, "EVOwner");
        assert_eq!(claims.nic.as_deref(), Some("123456789V"));
        assert_eq!(claims.iss, "evcharge");
        assert_eq!(claims.aud, "evcharge-clients");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(issued.expires_at.timestamp(), claims.exp);
        Ok(())
    }

    #[test]
    fn token_ids_are_unique() -> anyhow::Result<()> {
        let issuer = issuer();
        let owner_id = Uuid::new_v4();
        let first = issuer.issue_access_token(owner_id, "EVOwner", &Role::ev_owner(), None)?;
        let second = issuer.issue_access_token(owner_id, "EVOwner", &Role::ev_owner(), None)?;
        let first = issuer.verify_access_token(&first.token)?;
        let second = issuer.verify_access_token(&second.token)?;
        assert_ne!(first.jti, second.jti);
        assert!(first.nic.is_none());
        Ok(())
    }

    #[test]
    fn foreign_signature_is_rejected() -> anyhow::Result<()> {
        let other = TokenIssuer::new(AuthConfig::new(SecretString::from(
            "ffffffffffffffffffffffffffffffff",
        )));
        let issued = other.issue_access_token(Uuid::new_v4(), "EVOwner", &Role::ev_owner(), None)?;
        assert!(matches!(
            issuer().verify_access_token(&issued.token),
            Err(TokenError::Invalid(_))
        ));
        Ok(())
    }

    #[test]
    fn wrong_audience_is_rejected() -> anyhow::Result<()> {
        let other = TokenIssuer::new(
            AuthConfig::new(SecretString::from("0123456789abcdef0123456789abcdef"))
                .with_audience("someone-else".to_string()),
        );
        let issued = other.issue_access_token(Uuid::new_v4(), "EVOwner", &Role::ev_owner(), None)?;
        assert!(issuer().verify_access_token(&issued.token).is_err());
        Ok(())
    }

    #[test]
    fn expired_token_is_reported_as_expired() -> anyhow::Result<()> {
        let issuer = issuer();
        let now = Utc::now();
        let claims = AccessClaims {
            sub: Uuid::new_v4().to_string(),
            role: Role::ev_owner(),
            user_type: "EVOwner".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: (now - Duration::minutes(20)).timestamp(),
            exp: (now - Duration::minutes(5)).timestamp(),
            iss: "evcharge".to_string(),
            aud: "evcharge-clients".to_string(),
            nic: None,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &issuer.encoding)?;
        assert!(matches!(
            issuer.verify_access_token(&token),
            Err(TokenError::Expired)
        ));
        // The interceptor can still read the expiry.
        assert_eq!(peek_expiry(&token).map(|at| at.timestamp()), Some(claims.exp));
        Ok(())
    }

    #[test]
    fn peek_expiry_ignores_signature_but_not_structure() -> anyhow::Result<()> {
        let other = TokenIssuer::new(AuthConfig::new(SecretString::from(
            "ffffffffffffffffffffffffffffffff",
        )));
        let issued = other.issue_access_token(Uuid::new_v4(), "EVOwner", &Role::ev_owner(), None)?;
        assert_eq!(peek_expiry(&issued.token), Some(issued.expires_at));
        assert_eq!(peek_expiry("not.a.jwt"), None);
        assert_eq!(peek_expiry(""), None);
        Ok(())
    }

    #[test]
    fn refresh_tokens_are_opaque_and_distinct() -> anyhow::Result<()> {
        let issuer = issuer();
        let first = issuer.issue_refresh_token()?;
        let second = issuer.issue_refresh_token()?;
        assert_ne!(first.token, second.token);
        assert_eq!(first.token.len(), 43);
        assert!(!first.token.contains('.'));
        assert!(first.expires_at > Utc::now() + Duration::days(6));
        Ok(())
    }

    #[test]
    fn refresh_hash_is_sha256() {
        let hash = hash_refresh_token("abc");
        assert_eq!(hash.len(), 32);
        assert_eq!(hash, hash_refresh_token("abc"));
        assert_ne!(hash, hash_refresh_token("abd"));
    }

    #[test]
    fn issued_token_debug_is_redacted() -> anyhow::Result<()> {
        let issued = issuer().issue_refresh_token()?;
        assert!(!format!("{issued:?}").contains(&issued.token));
        Ok(())
    }
}
