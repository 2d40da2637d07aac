use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_VAULT_URL: &str = "vault-url";
pub const ARG_VAULT_ROLE_ID: &str = "vault-role-id";
pub const ARG_VAULT_SECRET_ID: &str = "vault-secret-id";
pub const ARG_VAULT_KV_MOUNT: &str = "vault-kv-mount";
pub const ARG_VAULT_KV_PATH: &str = "vault-kv-path";

/// Where to fetch the signing secret from when it is not given directly.
#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
    pub role_id: String,
    pub secret_id: SecretString,
    pub kv_mount: String,
    pub kv_path: String,
}

impl Options {
    /// `None` when no Vault URL is configured.
    ///
    /// # Errors
    /// Returns an error if a URL is given without AppRole credentials.
    pub fn parse(matches: &ArgMatches) -> Result<Option<Self>> {
        let Some(url) = matches.get_one::<String>(ARG_VAULT_URL).cloned() else {
            return Ok(None);
        };
        let role_id = matches
            .get_one::<String>(ARG_VAULT_ROLE_ID)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_VAULT_ROLE_ID}"))?;
        let secret_id = matches
            .get_one::<String>(ARG_VAULT_SECRET_ID)
            .map(|secret| SecretString::from(secret.clone()))
            .ok_or_else(|| {
                anyhow::anyhow!("missing required argument: --{ARG_VAULT_SECRET_ID}")
            })?;
        let kv_mount = matches
            .get_one::<String>(ARG_VAULT_KV_MOUNT)
            .cloned()
            .unwrap_or_else(|| "secret".to_string());
        let kv_path = matches
            .get_one::<String>(ARG_VAULT_KV_PATH)
            .cloned()
            .unwrap_or_else(|| "evcharge".to_string());

        Ok(Some(Self {
            url,
            role_id,
            secret_id,
            kv_mount,
            kv_path,
        }))
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VAULT_URL)
                .long(ARG_VAULT_URL)
                .help("Vault AppRole login URL, e.g. https://vault.tld:8200/v1/auth/approle/login")
                .env("EVCHARGE_VAULT_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_VAULT_ROLE_ID)
                .long(ARG_VAULT_ROLE_ID)
                .help("Vault AppRole role id")
                .env("EVCHARGE_VAULT_ROLE_ID")
                .global(true),
        )
        .arg(
            Arg::new(ARG_VAULT_SECRET_ID)
                .long(ARG_VAULT_SECRET_ID)
                .help("Vault AppRole secret id")
                .env("EVCHARGE_VAULT_SECRET_ID")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_MOUNT)
                .long(ARG_VAULT_KV_MOUNT)
                .help("Vault KV-v2 mount holding the signing secret")
                .env("EVCHARGE_VAULT_KV_MOUNT")
                .default_value("secret")
                .global(true),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_PATH)
                .long(ARG_VAULT_KV_PATH)
                .help("Vault KV-v2 path holding the signing secret")
                .env("EVCHARGE_VAULT_KV_PATH")
                .default_value("evcharge")
                .global(true),
        )
}
