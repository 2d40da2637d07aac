use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::TokenPair;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub nic: String,
    #[serde(default)]
    pub password: String,
}

/// Session metadata returned after login or refresh. Tokens travel only in
/// cookies and never appear in the body.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user_type: String,
    pub user_id: Uuid,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl From<&TokenPair> for SessionInfo {
    fn from(pair: &TokenPair) -> Self {
        Self {
            user_type: pair.user_type.clone(),
            user_id: pair.owner_id,
            access_token_expires_at: pair.access.expires_at,
            refresh_token_expires_at: pair.refresh.expires_at,
        }
    }
}
