use crate::{
    auth::{Role, TokenIssuer},
    cli::commands::{auth, vault},
};
use anyhow::Result;
use uuid::Uuid;

#[derive(Debug)]
pub struct Args {
    pub subject: Uuid,
    pub role: String,
    pub user_type: String,
    pub nic: Option<String>,
    pub auth: auth::Options,
    pub vault: Option<vault::Options>,
}

/// Mint an access token and print it to stdout.
/// # Errors
/// Returns an error if the signing secret cannot be resolved or signing fails.
pub async fn execute(args: Args) -> Result<()> {
    let config = super::auth_config(&args.auth, args.vault.as_ref()).await?;
    let issued = TokenIssuer::new(config).issue_access_token(
        args.subject,
        &args.user_type,
        &Role::new(args.role),
        args.nic.as_deref(),
    )?;

    println!("{}", issued.token);
    eprintln!("expires at {}", issued.expires_at.to_rfc3339());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn options(secret: Option<&str>) -> auth::Options {
        auth::Options {
            jwt_secret: secret.map(|s| SecretString::from(s.to_string())),
            issuer: "evcharge".to_string(),
            audience: "evcharge-clients".to_string(),
            access_token_minutes: 15,
            refresh_token_days: 7,
            access_cookie_path: "/api".to_string(),
            refresh_cookie_path: "/api/auth/refresh".to_string(),
        }
    }

    #[tokio::test]
    async fn issues_with_configured_secret() -> Result<()> {
        execute(Args {
            subject: Uuid::new_v4(),
            role: Role::BACK_OFFICE.to_string(),
            user_type: Role::BACK_OFFICE.to_string(),
            nic: None,
            auth: options(Some("0123456789abcdef0123456789abcdef")),
            vault: None,
        })
        .await
    }

    #[tokio::test]
    async fn rejects_short_or_missing_secret() {
        for secret in [Some("short"), None] {
            let result = execute(Args {
                subject: Uuid::new_v4(),
                role: Role::BACK_OFFICE.to_string(),
                user_type: Role::BACK_OFFICE.to_string(),
                nic: None,
                auth: options(secret),
                vault: None,
            })
            .await;
            assert!(result.is_err());
        }
    }
}
