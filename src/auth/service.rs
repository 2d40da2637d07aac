//! Login, refresh and logout against the owner and session stores.
//!
//! Flow Overview:
//! 1) Login verifies the NIC/password of an active account, mints both tokens,
//!    then persists one new session record keyed by the refresh-token digest.
//! 2) Refresh resolves an active, unexpired session and rotates its refresh
//!    token in place through a single conditional write. The previous value is
//!    dead the moment the write lands.
//! 3) Logout deactivates the active session holding the presented token.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
    USER_TYPE_EV_OWNER,
    config::AuthConfig,
    password::{verify_dummy, verify_password},
    principal::Principal,
    role::Role,
    token::{IssuedToken, TokenIssuer, hash_refresh_token},
};
use crate::{
    error::ServiceError,
    owners::validation::normalize_nic,
    store::{NewSession, OwnerStore, RotateSession, SessionStore},
};

/// Credentials handed back to the HTTP layer after login or refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub owner_id: Uuid,
    pub user_type: String,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

#[derive(Clone)]
pub struct AuthService {
    owners: Arc<dyn OwnerStore>,
    sessions: Arc<dyn SessionStore>,
    issuer: TokenIssuer,
}

impl AuthService {
    #[must_use]
    pub fn new(
        owners: Arc<dyn OwnerStore>,
        sessions: Arc<dyn SessionStore>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            owners,
            sessions,
            issuer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        self.issuer.config()
    }

    /// Authenticate an owner by NIC and password.
    ///
    /// # Errors
    /// [`ServiceError::InvalidCredentials`] for an unknown NIC, a wrong password,
    /// or an inactive account alike.
    #[instrument(skip_all)]
    pub async fn login(&self, nic: &str, password: &str) -> Result<TokenPair, ServiceError> {
        let nic = normalize_nic(nic);
        let owner = self
            .owners
            .find_owner_by_nic(&nic)
            .await?
            .filter(|owner| owner.active);

        let Some(owner) = owner else {
            verify_dummy(password);
            return Err(ServiceError::InvalidCredentials);
        };
        if !verify_password(password, &owner.password_hash) {
            return Err(ServiceError::InvalidCredentials);
        }

        let access = self.issuer.issue_access_token(
            owner.id,
            USER_TYPE_EV_OWNER,
            &Role::ev_owner(),
            Some(&owner.nic),
        )?;
        let refresh = self.issuer.issue_refresh_token()?;

        self.sessions
            .insert_session(NewSession {
                owner_id: owner.id,
                user_type: USER_TYPE_EV_OWNER.to_string(),
                token_hash: hash_refresh_token(&refresh.token),
                refresh_expires_at: refresh.expires_at,
            })
            .await?;

        // The session already exists; a failed bookkeeping write must not fail the login.
        if let Err(err) = self.owners.record_login(owner.id, Utc::now()).await {
            warn!("Failed to record last login: {err}");
        }

        debug!(owner_id = %owner.id, "Login succeeded");

        Ok(TokenPair {
            owner_id: owner.id,
            user_type: USER_TYPE_EV_OWNER.to_string(),
            access,
            refresh,
        })
    }

    /// Exchange a refresh token for a new pair, rotating it in place.
    ///
    /// # Errors
    /// [`ServiceError::InvalidOrExpiredRefreshToken`] when no active, unexpired
    /// session matches (including a lost rotation race), and
    /// [`ServiceError::AccountUnavailable`] when the owning account is gone or
    /// inactive; that session is deactivated first.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        if refresh_token.is_empty() {
            return Err(ServiceError::InvalidOrExpiredRefreshToken);
        }

        let current_hash = hash_refresh_token(refresh_token);
        let session = self
            .sessions
            .find_active_session(&current_hash, Utc::now())
            .await?
            .ok_or(ServiceError::InvalidOrExpiredRefreshToken)?;

        let owner = self
            .owners
            .find_owner_by_id(session.owner_id)
            .await?
            .filter(|owner| owner.active);
        let Some(owner) = owner else {
            self.sessions.deactivate_session(session.id).await?;
            debug!(session_id = %session.id, "Session closed for unavailable account");
            return Err(ServiceError::AccountUnavailable);
        };

        let access = self.issuer.issue_access_token(
            owner.id,
            &session.user_type,
            &Role::new(session.user_type.clone()),
            Some(&owner.nic),
        )?;
        let refresh = self.issuer.issue_refresh_token()?;

        let rotated = self
            .sessions
            .rotate_session(RotateSession {
                session_id: session.id,
                current_hash,
                new_hash: hash_refresh_token(&refresh.token),
                new_expires_at: refresh.expires_at,
                now: Utc::now(),
            })
            .await?;

        let Some(rotated) = rotated else {
            debug!(session_id = %session.id, "Refresh lost rotation race");
            return Err(ServiceError::InvalidOrExpiredRefreshToken);
        };

        Ok(TokenPair {
            owner_id: owner.id,
            user_type: rotated.user_type,
            access,
            refresh,
        })
    }

    /// Deactivate the session holding `refresh_token`.
    ///
    /// # Errors
    /// [`ServiceError::InvalidRefreshToken`] when no active session matches.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ServiceError> {
        let token_hash = hash_refresh_token(refresh_token);
        if self.sessions.deactivate_session_by_token(&token_hash).await? {
            Ok(())
        } else {
            Err(ServiceError::InvalidRefreshToken)
        }
    }

    /// Verify an access token and build the caller's principal.
    ///
    /// # Errors
    /// [`ServiceError::Unauthenticated`] for any invalid or expired token.
    pub fn authenticate(&self, access_token: &str) -> Result<Principal, ServiceError> {
        let claims = self.issuer.verify_access_token(access_token).map_err(|err| {
            debug!("Access token rejected: {err}");
            ServiceError::Unauthenticated
        })?;
        Principal::from_claims(claims).ok_or(ServiceError::Unauthenticated)
    }
}
