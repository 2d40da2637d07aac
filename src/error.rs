//! Service error taxonomy.
//!
//! Business-rule failures are ordinary variants returned to the HTTP layer;
//! anything unexpected is folded into [`ServiceError::Internal`], whose detail
//! is logged but never shown to the caller.

use crate::store::{ConflictField, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<String>,
    },
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired refresh token")]
    InvalidOrExpiredRefreshToken,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("EV Owner not found or inactive")]
    AccountUnavailable,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("An internal error occurred")]
    Internal(#[source] anyhow::Error),
}

impl ServiceError {
    #[must_use]
    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            errors,
        }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(ConflictField::Nic) => Self::rejected("NIC already exists"),
            StoreError::Conflict(ConflictField::Email) => Self::rejected("Email already exists"),
            StoreError::Timeout => Self::Internal(anyhow::Error::new(StoreError::Timeout)),
            StoreError::Backend(err) => Self::Internal(err),
        }
    }
}

impl From<crate::auth::TokenError> for ServiceError {
    fn from(err: crate::auth::TokenError) -> Self {
        Self::Internal(err.into())
    }
}
