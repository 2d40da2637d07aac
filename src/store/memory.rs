//! In-memory backend for development and tests.
//!
//! Every operation runs under a single lock acquisition, which gives the
//! conditional writes the same match-and-mutate atomicity the PostgreSQL
//! backend gets from `UPDATE ... WHERE ... RETURNING`. Data is lost when the
//! process exits.
//!
//! Session records are kept after logout for audit; only active sessions are
//! reachable through the token index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    ConflictField, NewOwner, NewSession, OwnerAccount, OwnerFilter, OwnerStore, OwnerUpdate,
    RotateSession, SessionRecord, SessionStore, StoreError, StoreResult,
};

#[derive(Default)]
struct State {
    owners: HashMap<Uuid, OwnerAccount>,
    sessions: HashMap<Uuid, SessionRecord>,
    /// Refresh-token digest to session id, active sessions only.
    by_token: HashMap<Vec<u8>, Uuid>,
}

impl State {
    fn close_session(&mut self, id: Uuid) -> bool {
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        self.by_token.remove(&session.token_hash);
        session.active = false;
        session.updated_at = Utc::now();
        true
    }

    fn conflict(
        &self,
        nic: Option<&str>,
        email: Option<&str>,
        except: Option<Uuid>,
    ) -> Option<ConflictField> {
        self.owners
            .values()
            .filter(|owner| Some(owner.id) != except)
            .find_map(|owner| {
                if nic.is_some_and(|nic| owner.nic == nic) {
                    Some(ConflictField::Nic)
                } else if email.is_some_and(|email| owner.email == email) {
                    Some(ConflictField::Email)
                } else {
                    None
                }
            })
    }
}

/// Cloneable handle; all clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All session records for an owner, oldest first.
    pub async fn sessions_for_owner(&self, owner_id: Uuid) -> Vec<SessionRecord> {
        let state = self.state.lock().await;
        let mut sessions: Vec<SessionRecord> = state
            .sessions
            .values()
            .filter(|session| session.owner_id == owner_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|session| session.created_at);
        sessions
    }

    /// Overwrite a session's refresh expiry. Used to simulate elapsed time.
    pub async fn set_session_expiry(&self, id: Uuid, expires_at: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().await;
        state
            .sessions
            .get_mut(&id)
            .map(|session| session.refresh_expires_at = expires_at)
            .is_some()
    }
}

#[async_trait]
impl OwnerStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_owner(&self, owner: NewOwner) -> StoreResult<OwnerAccount> {
        let mut state = self.state.lock().await;
        if let Some(field) = state.conflict(Some(&owner.nic), Some(&owner.email), None) {
            return Err(StoreError::Conflict(field));
        }
        let account = owner.into_account(Utc::now());
        state.owners.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_owner_by_id(&self, id: Uuid) -> StoreResult<Option<OwnerAccount>> {
        Ok(self.state.lock().await.owners.get(&id).cloned())
    }

    async fn find_owner_by_nic(&self, nic: &str) -> StoreResult<Option<OwnerAccount>> {
        let state = self.state.lock().await;
        Ok(state.owners.values().find(|owner| owner.nic == nic).cloned())
    }

    async fn find_owner_by_email(&self, email: &str) -> StoreResult<Option<OwnerAccount>> {
        let state = self.state.lock().await;
        Ok(state
            .owners
            .values()
            .find(|owner| owner.email == email)
            .cloned())
    }

    async fn list_owners(&self, filter: OwnerFilter) -> StoreResult<Vec<OwnerAccount>> {
        let state = self.state.lock().await;
        let mut owners: Vec<OwnerAccount> = state
            .owners
            .values()
            .filter(|owner| match filter {
                OwnerFilter::All => true,
                OwnerFilter::Inactive => !owner.active,
            })
            .cloned()
            .collect();
        owners.sort_by_key(|owner| owner.created_at);
        Ok(owners)
    }

    async fn update_owner(
        &self,
        id: Uuid,
        update: OwnerUpdate,
    ) -> StoreResult<Option<OwnerAccount>> {
        let mut state = self.state.lock().await;
        if !state.owners.contains_key(&id) {
            return Ok(None);
        }
        if let Some(field) = state.conflict(None, update.email.as_deref(), Some(id)) {
            return Err(StoreError::Conflict(field));
        }
        Ok(state.owners.get_mut(&id).map(|owner| {
            update.apply(owner, Utc::now());
            owner.clone()
        }))
    }

    async fn set_owner_active(
        &self,
        id: Uuid,
        active: bool,
        expected: Option<bool>,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let Some(owner) = state.owners.get_mut(&id) else {
            return Ok(false);
        };
        if expected.is_some_and(|expected| owner.active != expected) {
            return Ok(false);
        }
        owner.active = active;
        owner.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(owner) = state.owners.get_mut(&id) {
            owner.last_login_at = Some(at);
            owner.updated_at = at;
        }
        Ok(())
    }

    async fn delete_owner(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.lock().await.owners.remove(&id).is_some())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: NewSession) -> StoreResult<SessionRecord> {
        let record = session.into_record(Utc::now());
        let mut state = self.state.lock().await;
        state.by_token.insert(record.token_hash.clone(), record.id);
        state.sessions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_active_session(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SessionRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .by_token
            .get(token_hash)
            .and_then(|id| state.sessions.get(id))
            .filter(|session| session.is_usable(now))
            .cloned())
    }

    async fn rotate_session(&self, rotate: RotateSession) -> StoreResult<Option<SessionRecord>> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&rotate.session_id) else {
            return Ok(None);
        };
        if session.token_hash != rotate.current_hash || !session.is_usable(rotate.now) {
            return Ok(None);
        }
        session.token_hash = rotate.new_hash.clone();
        session.refresh_expires_at = rotate.new_expires_at;
        session.updated_at = rotate.now;
        let rotated = session.clone();

        state.by_token.remove(&rotate.current_hash);
        state.by_token.insert(rotate.new_hash, rotated.id);
        Ok(Some(rotated))
    }

    async fn deactivate_session(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.lock().await.close_session(id))
    }

    async fn deactivate_session_by_token(&self, token_hash: &[u8]) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.by_token.get(token_hash).copied() {
            Some(id) => Ok(state.close_session(id)),
            None => Ok(false),
        }
    }
}
