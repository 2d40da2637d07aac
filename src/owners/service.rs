//! Owner account lifecycle: registration, lookup, profile edits, activation,
//! and hard delete.
//!
//! Authorization is decided by the HTTP layer from the caller's principal;
//! this service only enforces data rules.

use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::validation::{
    check_required, check_vehicles, normalize_email, normalize_nic, password_policy_violation,
    valid_email, valid_nic, valid_phone,
};
use crate::{
    auth::password::hash_password,
    error::ServiceError,
    store::{NewOwner, OwnerAccount, OwnerFilter, OwnerStore, OwnerUpdate, Vehicle},
};

const NOT_FOUND: &str = "EV Owner not found";

/// Self-registration input, before normalization.
#[derive(Debug, Clone)]
pub struct Registration {
    pub nic: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub vehicles: Vec<Vehicle>,
}

#[derive(Clone)]
pub struct OwnerService {
    owners: Arc<dyn OwnerStore>,
}

impl OwnerService {
    #[must_use]
    pub fn new(owners: Arc<dyn OwnerStore>) -> Self {
        Self { owners }
    }

    /// Create an active account.
    ///
    /// # Errors
    /// [`ServiceError::Validation`] for malformed input and
    /// [`ServiceError::Rejected`] for a duplicate NIC or email.
    #[instrument(skip_all)]
    pub async fn register(&self, input: Registration) -> Result<OwnerAccount, ServiceError> {
        let nic = normalize_nic(&input.nic);
        let email = normalize_email(&input.email);

        let mut errors = Vec::new();
        if !valid_nic(&nic) {
            errors.push("Invalid NIC format".to_string());
        }
        check_required(&mut errors, "First name", &input.first_name);
        check_required(&mut errors, "Last name", &input.last_name);
        if !valid_email(&email) {
            errors.push("Invalid email address".to_string());
        }
        if !valid_phone(&input.phone_number) {
            errors.push("Invalid phone number".to_string());
        }
        if let Some(message) = password_policy_violation(&input.password) {
            errors.push(message);
        }
        check_vehicles(&mut errors, &input.vehicles);
        if !errors.is_empty() {
            return Err(ServiceError::validation(errors));
        }

        if self.owners.find_owner_by_nic(&nic).await?.is_some() {
            return Err(ServiceError::rejected("NIC already exists"));
        }
        if self.owners.find_owner_by_email(&email).await?.is_some() {
            return Err(ServiceError::rejected("Email already exists"));
        }

        let password_hash = hash_password(&input.password).map_err(ServiceError::Internal)?;

        // A concurrent registration can still win between the checks and the
        // insert; the store's unique indexes report it as the same conflict.
        let account = self
            .owners
            .insert_owner(NewOwner {
                nic,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                email,
                phone_number: input.phone_number.trim().to_string(),
                password_hash,
                vehicles: input.vehicles,
            })
            .await?;

        debug!(owner_id = %account.id, "Owner registered");
        Ok(account)
    }

    /// Store liveness, for health checks.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.owners.ping().await?)
    }

    /// # Errors
    /// [`ServiceError::NotFound`] when no account has `id`.
    pub async fn get_by_id(&self, id: Uuid) -> Result<OwnerAccount, ServiceError> {
        self.owners
            .find_owner_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(NOT_FOUND))
    }

    /// # Errors
    /// [`ServiceError::NotFound`] when no account has `nic`.
    pub async fn get_by_nic(&self, nic: &str) -> Result<OwnerAccount, ServiceError> {
        self.owners
            .find_owner_by_nic(&normalize_nic(nic))
            .await?
            .ok_or_else(|| ServiceError::not_found(NOT_FOUND))
    }

    /// # Errors
    /// Store failures only.
    pub async fn list_all(&self) -> Result<Vec<OwnerAccount>, ServiceError> {
        Ok(self.owners.list_owners(OwnerFilter::All).await?)
    }

    /// # Errors
    /// Store failures only.
    pub async fn list_deactivated(&self) -> Result<Vec<OwnerAccount>, ServiceError> {
        Ok(self.owners.list_owners(OwnerFilter::Inactive).await?)
    }

    /// Edit profile fields. NIC and password are not editable here.
    ///
    /// # Errors
    /// [`ServiceError::Validation`] for an empty or malformed update,
    /// [`ServiceError::Rejected`] when the new email belongs to another account,
    /// [`ServiceError::NotFound`] when no account has `id`.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        id: Uuid,
        mut update: OwnerUpdate,
    ) -> Result<OwnerAccount, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::Validation {
                message: "No updates provided".to_string(),
                errors: Vec::new(),
            });
        }

        let mut errors = Vec::new();
        if let Some(first_name) = update.first_name.as_mut() {
            check_required(&mut errors, "First name", first_name);
            *first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name.as_mut() {
            check_required(&mut errors, "Last name", last_name);
            *last_name = last_name.trim().to_string();
        }
        if let Some(email) = update.email.as_mut() {
            *email = normalize_email(email);
            if !valid_email(email) {
                errors.push("Invalid email address".to_string());
            }
        }
        if let Some(phone_number) = update.phone_number.as_mut() {
            if !valid_phone(phone_number) {
                errors.push("Invalid phone number".to_string());
            }
            *phone_number = phone_number.trim().to_string();
        }
        if let Some(vehicles) = &update.vehicles {
            check_vehicles(&mut errors, vehicles);
        }
        if !errors.is_empty() {
            return Err(ServiceError::validation(errors));
        }

        if let Some(email) = &update.email
            && let Some(existing) = self.owners.find_owner_by_email(email).await?
            && existing.id != id
        {
            return Err(ServiceError::rejected("Email already exists"));
        }

        self.owners
            .update_owner(id, update)
            .await?
            .ok_or_else(|| ServiceError::not_found(NOT_FOUND))
    }

    /// Set the active flag unconditionally.
    ///
    /// # Errors
    /// [`ServiceError::NotFound`] when no account has `id`.
    #[instrument(skip(self))]
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<(), ServiceError> {
        if self.owners.set_owner_active(id, active, None).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found(NOT_FOUND))
        }
    }

    /// Reactivate an account that is currently inactive.
    ///
    /// # Errors
    /// [`ServiceError::NotFound`] when no account has `id`, and
    /// [`ServiceError::Rejected`] when it is already active.
    #[instrument(skip(self))]
    pub async fn reactivate(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.owners.set_owner_active(id, true, Some(false)).await? {
            return Ok(());
        }
        match self.owners.find_owner_by_id(id).await? {
            Some(_) => Err(ServiceError::rejected("EV Owner is already active")),
            None => Err(ServiceError::not_found(NOT_FOUND)),
        }
    }

    /// Permanently remove the account. Session records are kept for audit.
    ///
    /// # Errors
    /// [`ServiceError::NotFound`] when no account has `id`.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.owners.delete_owner(id).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found(NOT_FOUND))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::verify_password, store::MemoryStore};

    fn service() -> OwnerService {
        OwnerService::new(Arc::new(MemoryStore::new()))
    }

    fn registration() -> Registration {
        Registration {
            nic: "123456789v".to_string(),
            first_name: "Nimal".to_string(),
            last_name: "Perera".to_string(),
            email: "Nimal@Example.com".to_string(),
            phone_number: "0771234567".to_string(),
            password: "Abc12345!".to_string(),
            vehicles: vec![Vehicle {
                make: "Nissan".to_string(),
                model: "Leaf".to_string(),
                license_plate: "CAB-1234".to_string(),
                year: 2021,
            }],
        }
    }

    #[tokio::test]
    async fn register_normalizes_and_hashes() -> anyhow::Result<()> {
        let account = service().register(registration()).await?;
        assert_eq!(account.nic, "123456789V");
        assert_eq!(account.email, "nimal@example.com");
        assert!(account.active);
        assert_ne!(account.password_hash, "Abc12345!");
        assert!(verify_password("Abc12345!", &account.password_hash));
        Ok(())
    }

    #[tokio::test]
    async fn register_collects_field_errors() {
        let mut input = registration();
        input.nic = "1234".to_string();
        input.email = "nope".to_string();
        input.password = "weak".to_string();

        let result = service().register(input).await;
        let Err(ServiceError::Validation { errors, .. }) = &result else {
            panic!("expected validation error, got {result:?}");
        };
        assert!(errors.contains(&"Invalid NIC format".to_string()));
        assert!(errors.contains(&"Invalid email address".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("Password must contain")));
    }

    #[tokio::test]
    async fn register_rejects_duplicates() -> anyhow::Result<()> {
        let service = service();
        service.register(registration()).await?;

        let result = service.register(registration()).await;
        assert!(matches!(result, Err(ServiceError::Rejected(ref m)) if m == "NIC already exists"));

        let mut other = registration();
        other.nic = "987654321V".to_string();
        let result = service.register(other).await;
        assert!(matches!(result, Err(ServiceError::Rejected(ref m)) if m == "Email already exists"));
        Ok(())
    }

    #[tokio::test]
    async fn update_requires_a_field() -> anyhow::Result<()> {
        let service = service();
        let account = service.register(registration()).await?;
        let result = service
            .update_profile(account.id, OwnerUpdate::default())
            .await;
        assert!(matches!(result, Err(ServiceError::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn update_changes_profile_but_not_nic() -> anyhow::Result<()> {
        let service = service();
        let account = service.register(registration()).await?;
        let updated = service
            .update_profile(
                account.id,
                OwnerUpdate {
                    first_name: Some("  Sunil ".to_string()),
                    email: Some("SUNIL@example.com".to_string()),
                    ..OwnerUpdate::default()
                },
            )
            .await?;
        assert_eq!(updated.first_name, "Sunil");
        assert_eq!(updated.email, "sunil@example.com");
        assert_eq!(updated.nic, account.nic);
        assert!(updated.updated_at >= account.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn reactivate_only_inactive_accounts() -> anyhow::Result<()> {
        let service = service();
        let account = service.register(registration()).await?;

        let result = service.reactivate(account.id).await;
        assert!(matches!(result, Err(ServiceError::Rejected(_))));

        service.set_active(account.id, false).await?;
        assert_eq!(service.list_deactivated().await?.len(), 1);
        service.reactivate(account.id).await?;
        assert!(service.list_deactivated().await?.is_empty());

        let result = service.reactivate(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_permanent() -> anyhow::Result<()> {
        let service = service();
        let account = service.register(registration()).await?;
        service.delete(account.id).await?;
        assert!(matches!(
            service.get_by_id(account.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(account.id).await,
            Err(ServiceError::NotFound(_))
        ));
        Ok(())
    }
}
