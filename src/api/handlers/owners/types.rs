use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    owners::Registration,
    store::{OwnerAccount, OwnerUpdate, Vehicle},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub nic: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

impl From<RegisterRequest> for Registration {
    fn from(request: RegisterRequest) -> Self {
        Self {
            nic: request.nic,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone_number: request.phone_number,
            password: request.password,
            vehicles: request.vehicles,
        }
    }
}

/// Editable profile fields. NIC and password are rejected as unknown fields.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOwnerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub vehicles: Option<Vec<Vehicle>>,
}

impl From<UpdateOwnerRequest> for OwnerUpdate {
    fn from(request: UpdateOwnerRequest) -> Self {
        Self {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone_number: request.phone_number,
            vehicles: request.vehicles,
        }
    }
}

/// Public view of an account; the password hash is never serialized.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerView {
    pub id: Uuid,
    pub nic: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub is_active: bool,
    pub vehicles: Vec<Vehicle>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OwnerAccount> for OwnerView {
    fn from(account: OwnerAccount) -> Self {
        Self {
            id: account.id,
            nic: account.nic,
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
            phone_number: account.phone_number,
            is_active: account.active,
            vehicles: account.vehicles,
            last_login: account.last_login_at,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
