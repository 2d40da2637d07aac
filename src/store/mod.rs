//! Record stores for owner accounts and refresh-token sessions.
//!
//! Both stores are consumed through object-safe async traits so the services
//! can run against PostgreSQL in production and [`MemoryStore`] in development
//! and tests. Conditional writes (`set_owner_active`, `rotate_session`,
//! `deactivate_session_by_token`) must be a single match-and-mutate operation
//! in every backend; callers rely on that for race safety and hold no locks of
//! their own.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Unique field that rejected an insert or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Nic,
    Email,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nic => f.write_str("nic"),
            Self::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    Conflict(ConflictField),
    #[error("store operation timed out")]
    Timeout,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub license_plate: String,
    pub year: i32,
}

/// Stored owner account. `password_hash` never leaves the crate boundary
/// through the HTTP layer.
#[derive(Debug, Clone)]
pub struct OwnerAccount {
    pub id: Uuid,
    pub nic: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub active: bool,
    pub vehicles: Vec<Vehicle>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new account; identifiers are already normalized.
#[derive(Debug, Clone)]
pub struct NewOwner {
    pub nic: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub vehicles: Vec<Vehicle>,
}

impl NewOwner {
    pub(crate) fn into_account(self, now: DateTime<Utc>) -> OwnerAccount {
        OwnerAccount {
            id: Uuid::new_v4(),
            nic: self.nic,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            password_hash: self.password_hash,
            active: true,
            vehicles: self.vehicles,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct OwnerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub vehicles: Option<Vec<Vehicle>>,
}

impl OwnerUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.vehicles.is_none()
    }

    pub(crate) fn apply(&self, account: &mut OwnerAccount, now: DateTime<Utc>) {
        if let Some(first_name) = &self.first_name {
            account.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &self.last_name {
            account.last_name.clone_from(last_name);
        }
        if let Some(email) = &self.email {
            account.email.clone_from(email);
        }
        if let Some(phone_number) = &self.phone_number {
            account.phone_number.clone_from(phone_number);
        }
        if let Some(vehicles) = &self.vehicles {
            account.vehicles.clone_from(vehicles);
        }
        account.updated_at = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFilter {
    All,
    Inactive,
}

/// One row per login event, rotated in place across its refresh chain.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub user_type: String,
    pub token_hash: Vec<u8>,
    pub refresh_expires_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether this record still authorizes a refresh at `now`.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.refresh_expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub owner_id: Uuid,
    pub user_type: String,
    pub token_hash: Vec<u8>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl NewSession {
    pub(crate) fn into_record(self, now: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            user_type: self.user_type,
            token_hash: self.token_hash,
            refresh_expires_at: self.refresh_expires_at,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Compare-and-swap of a session's refresh token.
///
/// Applies only while the record still carries `current_hash`, is active, and
/// has not expired at `now`.
#[derive(Debug, Clone)]
pub struct RotateSession {
    pub session_id: Uuid,
    pub current_hash: Vec<u8>,
    pub new_hash: Vec<u8>,
    pub new_expires_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

#[async_trait]
pub trait OwnerStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn insert_owner(&self, owner: NewOwner) -> StoreResult<OwnerAccount>;

    async fn find_owner_by_id(&self, id: Uuid) -> StoreResult<Option<OwnerAccount>>;

    async fn find_owner_by_nic(&self, nic: &str) -> StoreResult<Option<OwnerAccount>>;

    async fn find_owner_by_email(&self, email: &str) -> StoreResult<Option<OwnerAccount>>;

    async fn list_owners(&self, filter: OwnerFilter) -> StoreResult<Vec<OwnerAccount>>;

    async fn update_owner(&self, id: Uuid, update: OwnerUpdate)
    -> StoreResult<Option<OwnerAccount>>;

    /// Set the active flag. With `expected = Some(state)` the write only applies
    /// while the account is currently in `state`. Returns whether a row changed.
    async fn set_owner_active(
        &self,
        id: Uuid,
        active: bool,
        expected: Option<bool>,
    ) -> StoreResult<bool>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    async fn delete_owner(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: NewSession) -> StoreResult<SessionRecord>;

    /// Active, unexpired session whose refresh-token digest equals `token_hash`.
    async fn find_active_session(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SessionRecord>>;

    /// `None` when the guard no longer matches; a concurrent rotation won.
    async fn rotate_session(&self, rotate: RotateSession) -> StoreResult<Option<SessionRecord>>;

    async fn deactivate_session(&self, id: Uuid) -> StoreResult<bool>;

    /// Deactivate the active session holding `token_hash`. Returns whether one matched.
    async fn deactivate_session_by_token(&self, token_hash: &[u8]) -> StoreResult<bool>;
}
