//! PostgreSQL backend.
//!
//! Conditional writes are single `UPDATE ... WHERE ... RETURNING` statements so
//! the database serializes competing rotations. Every call is bounded by the
//! configured I/O timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
    types::Json,
};
use std::{future::Future, time::Duration};
use tracing::{Instrument, Span, info_span};
use uuid::Uuid;

use super::{
    ConflictField, NewOwner, NewSession, OwnerAccount, OwnerFilter, OwnerStore, OwnerUpdate,
    RotateSession, SessionRecord, SessionStore, StoreError, StoreResult, Vehicle,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    /// Connect a pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if the initial connection cannot be established.
    pub async fn connect(dsn: &str, timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .acquire_timeout(timeout)
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::from_pool(pool, timeout))
    }

    #[must_use]
    pub fn from_pool(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Create tables and indexes if they do not exist.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(query_span("DDL", "sql/schema.sql"))
            .await
            .context("failed to apply schema")?;
        Ok(())
    }

    async fn bounded<T, F>(&self, operation: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn map_db_error(err: sqlx::Error, context: &'static str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().is_some_and(|code| code.as_ref() == "23505")
    {
        match db_err.constraint() {
            Some("ev_owners_nic_key") => return StoreError::Conflict(ConflictField::Nic),
            Some("ev_owners_email_key") => return StoreError::Conflict(ConflictField::Email),
            _ => {}
        }
    }
    StoreError::Backend(anyhow::Error::new(err).context(context))
}

fn owner_from_row(row: &PgRow) -> Result<OwnerAccount, sqlx::Error> {
    let vehicles: Json<Vec<Vehicle>> = row.try_get("vehicles")?;
    Ok(OwnerAccount {
        id: row.try_get("id")?,
        nic: row.try_get("nic")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        password_hash: row.try_get("password_hash")?,
        active: row.try_get("is_active")?,
        vehicles: vehicles.0,
        last_login_at: row.try_get("last_login_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<SessionRecord, sqlx::Error> {
    Ok(SessionRecord {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        user_type: row.try_get("user_type")?,
        token_hash: row.try_get("token_hash")?,
        refresh_expires_at: row.try_get("refresh_expires_at")?,
        active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl OwnerStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        let query = "SELECT 1";
        self.bounded(async {
            sqlx::query(query)
                .execute(&self.pool)
                .instrument(query_span("SELECT", query))
                .await
                .map_err(|err| map_db_error(err, "failed to ping database"))?;
            Ok(())
        })
        .await
    }

    async fn insert_owner(&self, owner: NewOwner) -> StoreResult<OwnerAccount> {
        let account = owner.into_account(Utc::now());
        let query = r"
            INSERT INTO ev_owners
                (id, nic, first_name, last_name, email, phone_number, password_hash,
                 is_active, vehicles, last_login_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, nic, first_name, last_name, email, phone_number, password_hash,
                      is_active, vehicles, last_login_at, created_at, updated_at
        ";
        self.bounded(async {
            let row = sqlx::query(query)
                .bind(account.id)
                .bind(&account.nic)
                .bind(&account.first_name)
                .bind(&account.last_name)
                .bind(&account.email)
                .bind(&account.phone_number)
                .bind(&account.password_hash)
                .bind(account.active)
                .bind(Json(&account.vehicles))
                .bind(account.last_login_at)
                .bind(account.created_at)
                .bind(account.updated_at)
                .fetch_one(&self.pool)
                .instrument(query_span("INSERT", query))
                .await
                .map_err(|err| map_db_error(err, "failed to insert owner"))?;
            owner_from_row(&row).map_err(|err| map_db_error(err, "failed to decode owner"))
        })
        .await
    }

    async fn find_owner_by_id(&self, id: Uuid) -> StoreResult<Option<OwnerAccount>> {
        let query = r"
            SELECT id, nic, first_name, last_name, email, phone_number, password_hash,
                   is_active, vehicles, last_login_at, created_at, updated_at
            FROM ev_owners WHERE id = $1
        ";
        self.bounded(async {
            let row = sqlx::query(query)
                .bind(id)
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", query))
                .await
                .map_err(|err| map_db_error(err, "failed to lookup owner by id"))?;
            row.as_ref()
                .map(owner_from_row)
                .transpose()
                .map_err(|err| map_db_error(err, "failed to decode owner"))
        })
        .await
    }

    async fn find_owner_by_nic(&self, nic: &str) -> StoreResult<Option<OwnerAccount>> {
        let query = r"
            SELECT id, nic, first_name, last_name, email, phone_number, password_hash,
                   is_active, vehicles, last_login_at, created_at, updated_at
            FROM ev_owners WHERE nic = $1
        ";
        self.bounded(async {
            let row = sqlx::query(query)
                .bind(nic)
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", query))
                .await
                .map_err(|err| map_db_error(err, "failed to lookup owner by nic"))?;
            row.as_ref()
                .map(owner_from_row)
                .transpose()
                .map_err(|err| map_db_error(err, "failed to decode owner"))
        })
        .await
    }

    async fn find_owner_by_email(&self, email: &str) -> StoreResult<Option<OwnerAccount>> {
        let query = r"
            SELECT id, nic, first_name, last_name, email, phone_number, password_hash,
                   is_active, vehicles, last_login_at, created_at, updated_at
            FROM ev_owners WHERE email = $1
        ";
        self.bounded(async {
            let row = sqlx::query(query)
                .bind(email)
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", query))
                .await
                .map_err(|err| map_db_error(err, "failed to lookup owner by email"))?;
            row.as_ref()
                .map(owner_from_row)
                .transpose()
                .map_err(|err| map_db_error(err, "failed to decode owner"))
        })
        .await
    }

    async fn list_owners(&self, filter: OwnerFilter) -> StoreResult<Vec<OwnerAccount>> {
        let query = r"
            SELECT id, nic, first_name, last_name, email, phone_number, password_hash,
                   is_active, vehicles, last_login_at, created_at, updated_at
            FROM ev_owners
            WHERE ($1 = FALSE OR is_active = FALSE)
            ORDER BY created_at
        ";
        let inactive_only = filter == OwnerFilter::Inactive;
        self.bounded(async {
            let rows = sqlx::query(query)
                .bind(inactive_only)
                .fetch_all(&self.pool)
                .instrument(query_span("SELECT", query))
                .await
                .map_err(|err| map_db_error(err, "failed to list owners"))?;
            rows.iter()
                .map(owner_from_row)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| map_db_error(err, "failed to decode owner"))
        })
        .await
    }

    async fn update_owner(
        &self,
        id: Uuid,
        update: OwnerUpdate,
    ) -> StoreResult<Option<OwnerAccount>> {
        let query = r"
            UPDATE ev_owners SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone_number = COALESCE($5, phone_number),
                vehicles = COALESCE($6, vehicles),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, nic, first_name, last_name, email, phone_number, password_hash,
                      is_active, vehicles, last_login_at, created_at, updated_at
        ";
        self.bounded(async {
            let row = sqlx::query(query)
                .bind(id)
                .bind(update.first_name.as_deref())
                .bind(update.last_name.as_deref())
                .bind(update.email.as_deref())
                .bind(update.phone_number.as_deref())
                .bind(update.vehicles.as_ref().map(Json))
                .fetch_optional(&self.pool)
                .instrument(query_span("UPDATE", query))
                .await
                .map_err(|err| map_db_error(err, "failed to update owner"))?;
            row.as_ref()
                .map(owner_from_row)
                .transpose()
                .map_err(|err| map_db_error(err, "failed to decode owner"))
        })
        .await
    }

    async fn set_owner_active(
        &self,
        id: Uuid,
        active: bool,
        expected: Option<bool>,
    ) -> StoreResult<bool> {
        let query = r"
            UPDATE ev_owners SET is_active = $2, updated_at = NOW()
            WHERE id = $1 AND ($3::BOOLEAN IS NULL OR is_active = $3)
        ";
        self.bounded(async {
            let result = sqlx::query(query)
                .bind(id)
                .bind(active)
                .bind(expected)
                .execute(&self.pool)
                .instrument(query_span("UPDATE", query))
                .await
                .map_err(|err| map_db_error(err, "failed to set owner active flag"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let query = "UPDATE ev_owners SET last_login_at = $2, updated_at = $2 WHERE id = $1";
        self.bounded(async {
            sqlx::query(query)
                .bind(id)
                .bind(at)
                .execute(&self.pool)
                .instrument(query_span("UPDATE", query))
                .await
                .map_err(|err| map_db_error(err, "failed to record login"))?;
            Ok(())
        })
        .await
    }

    async fn delete_owner(&self, id: Uuid) -> StoreResult<bool> {
        let query = "DELETE FROM ev_owners WHERE id = $1";
        self.bounded(async {
            let result = sqlx::query(query)
                .bind(id)
                .execute(&self.pool)
                .instrument(query_span("DELETE", query))
                .await
                .map_err(|err| map_db_error(err, "failed to delete owner"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: NewSession) -> StoreResult<SessionRecord> {
        let record = session.into_record(Utc::now());
        let query = r"
            INSERT INTO auth_sessions
                (id, owner_id, user_type, token_hash, refresh_expires_at, is_active,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ";
        self.bounded(async {
            sqlx::query(query)
                .bind(record.id)
                .bind(record.owner_id)
                .bind(&record.user_type)
                .bind(&record.token_hash)
                .bind(record.refresh_expires_at)
                .bind(record.active)
                .bind(record.created_at)
                .bind(record.updated_at)
                .execute(&self.pool)
                .instrument(query_span("INSERT", query))
                .await
                .map_err(|err| map_db_error(err, "failed to insert session"))?;
            Ok(())
        })
        .await?;
        Ok(record)
    }

    async fn find_active_session(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SessionRecord>> {
        let query = r"
            SELECT id, owner_id, user_type, token_hash, refresh_expires_at, is_active,
                   created_at, updated_at
            FROM auth_sessions
            WHERE token_hash = $1 AND is_active AND refresh_expires_at > $2
        ";
        self.bounded(async {
            let row = sqlx::query(query)
                .bind(token_hash)
                .bind(now)
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", query))
                .await
                .map_err(|err| map_db_error(err, "failed to lookup session"))?;
            row.as_ref()
                .map(session_from_row)
                .transpose()
                .map_err(|err| map_db_error(err, "failed to decode session"))
        })
        .await
    }

    async fn rotate_session(&self, rotate: RotateSession) -> StoreResult<Option<SessionRecord>> {
        let query = r"
            UPDATE auth_sessions
            SET token_hash = $3, refresh_expires_at = $4, updated_at = $5
            WHERE id = $1
              AND token_hash = $2
              AND is_active
              AND refresh_expires_at > $5
            RETURNING id, owner_id, user_type, token_hash, refresh_expires_at, is_active,
                      created_at, updated_at
        ";
        self.bounded(async {
            let row = sqlx::query(query)
                .bind(rotate.session_id)
                .bind(&rotate.current_hash)
                .bind(&rotate.new_hash)
                .bind(rotate.new_expires_at)
                .bind(rotate.now)
                .fetch_optional(&self.pool)
                .instrument(query_span("UPDATE", query))
                .await
                .map_err(|err| map_db_error(err, "failed to rotate session"))?;
            row.as_ref()
                .map(session_from_row)
                .transpose()
                .map_err(|err| map_db_error(err, "failed to decode session"))
        })
        .await
    }

    async fn deactivate_session(&self, id: Uuid) -> StoreResult<bool> {
        let query = "UPDATE auth_sessions SET is_active = FALSE, updated_at = NOW() WHERE id = $1";
        self.bounded(async {
            let result = sqlx::query(query)
                .bind(id)
                .execute(&self.pool)
                .instrument(query_span("UPDATE", query))
                .await
                .map_err(|err| map_db_error(err, "failed to deactivate session"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn deactivate_session_by_token(&self, token_hash: &[u8]) -> StoreResult<bool> {
        let query = r"
            UPDATE auth_sessions SET is_active = FALSE, updated_at = NOW()
            WHERE token_hash = $1 AND is_active
        ";
        self.bounded(async {
            let result = sqlx::query(query)
                .bind(token_hash)
                .execute(&self.pool)
                .instrument(query_span("UPDATE", query))
                .await
                .map_err(|err| map_db_error(err, "failed to deactivate session"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }
}
