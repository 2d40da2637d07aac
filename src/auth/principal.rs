//! Authenticated caller derived from a verified access token.

use uuid::Uuid;

use super::{role::Role, token::AccessClaims};
use crate::error::ServiceError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub owner_id: Uuid,
    pub role: Role,
    pub user_type: String,
    pub nic: Option<String>,
}

impl Principal {
    /// `None` when the subject is not an account id.
    #[must_use]
    pub fn from_claims(claims: AccessClaims) -> Option<Self> {
        let owner_id = Uuid::parse_str(&claims.sub).ok()?;
        Some(Self {
            owner_id,
            role: claims.role,
            user_type: claims.user_type,
            nic: claims.nic,
        })
    }

    #[must_use]
    pub fn is_back_office(&self) -> bool {
        self.role.is_back_office()
    }

    /// Back-office only.
    ///
    /// # Errors
    /// [`ServiceError::Forbidden`] for any other role.
    pub fn require_back_office(&self) -> Result<(), ServiceError> {
        if self.is_back_office() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }

    /// The account itself, or back-office.
    ///
    /// # Errors
    /// [`ServiceError::Forbidden`] when the caller is neither.
    pub fn require_self_or_back_office(&self, owner_id: Uuid) -> Result<(), ServiceError> {
        if self.is_back_office() || self.owner_id == owner_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }

    /// Same rule keyed by NIC, using the NIC claim of the token.
    ///
    /// # Errors
    /// [`ServiceError::Forbidden`] when the caller is neither.
    pub fn require_nic_or_back_office(&self, nic: &str) -> Result<(), ServiceError> {
        if self.is_back_office() || self.nic.as_deref() == Some(nic) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}
