use crate::{
    api::{
        self, Services,
        rate_limit::{FixedWindowRateLimiter, RateLimiter},
    },
    auth::{AuthService, TokenIssuer},
    cli::commands::{auth, vault},
    owners::OwnerService,
    store::{MemoryStore, OwnerStore, PgStore, SessionStore},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub store_timeout: Duration,
    pub frontend_origin: Option<String>,
    pub rate_limit_permits: u32,
    pub rate_limit_window: Duration,
    pub auth: auth::Options,
    pub vault: Option<vault::Options>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the signing secret cannot be resolved, the store is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = super::auth_config(&args.auth, args.vault.as_ref()).await?;

    let (owners, sessions): (Arc<dyn OwnerStore>, Arc<dyn SessionStore>) = match &args.dsn {
        Some(dsn) => {
            let store = PgStore::connect(dsn.expose_secret(), args.store_timeout)
                .await
                .context("Failed to connect to database")?;
            store
                .ensure_schema()
                .await
                .context("Failed to apply database schema")?;
            info!("Using PostgreSQL store");
            let store = Arc::new(store);
            (store.clone(), store)
        }
        None => {
            warn!("No DSN configured; accounts and sessions are kept in memory");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };

    let services = Services {
        auth: Arc::new(AuthService::new(
            owners.clone(),
            sessions,
            TokenIssuer::new(auth_config),
        )),
        owners: Arc::new(OwnerService::new(owners)),
        rate_limiter: rate_limiter(args.rate_limit_permits, args.rate_limit_window),
    };

    api::new(args.port, services, args.frontend_origin.as_deref()).await
}

fn rate_limiter(permits: u32, window: Duration) -> Arc<dyn RateLimiter> {
    info!(
        permits,
        window_seconds = window.as_secs(),
        "Rate limiting enabled"
    );
    Arc::new(FixedWindowRateLimiter::new(permits, window))
}
