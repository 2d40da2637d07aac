pub mod server;
pub mod token;

mod run;

use anyhow::{Context, Result};
use secrecy::SecretString;

use crate::{
    auth::AuthConfig,
    cli::commands::{auth, vault as vault_args},
    vault,
};

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    IssueToken(token::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// Resolve the signing secret and build a validated [`AuthConfig`].
///
/// A secret given on the command line wins over Vault.
async fn auth_config(
    auth: &auth::Options,
    vault_opts: Option<&vault_args::Options>,
) -> Result<AuthConfig> {
    let secret: SecretString = match (&auth.jwt_secret, vault_opts) {
        (Some(secret), _) => secret.clone(),
        (None, Some(opts)) => {
            vault::fetch_signing_secret(
                &opts.url,
                &opts.role_id,
                &opts.secret_id,
                &opts.kv_mount,
                &opts.kv_path,
            )
            .await?
        }
        (None, None) => anyhow::bail!("No JWT signing secret configured"),
    };

    let config = AuthConfig::new(secret)
        .with_issuer(auth.issuer.clone())
        .with_audience(auth.audience.clone())
        .with_access_token_minutes(auth.access_token_minutes)
        .with_refresh_token_days(auth.refresh_token_days)
        .with_access_cookie_path(auth.access_cookie_path.clone())
        .with_refresh_cookie_path(auth.refresh_cookie_path.clone());
    config.validate().context("Invalid token configuration")?;
    Ok(config)
}
