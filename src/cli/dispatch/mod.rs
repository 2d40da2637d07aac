//! Map validated CLI arguments to an action: the API server by default, or
//! `issue-token`.

use crate::cli::actions::{Action, server, token};
use crate::cli::commands::{
    self, ARG_DSN, ARG_FRONTEND_ORIGIN, ARG_PORT, ARG_RATE_LIMIT_PERMITS,
    ARG_RATE_LIMIT_WINDOW_MINUTES, ARG_STORE_TIMEOUT_SECONDS, auth,
    token::{ARG_NIC, ARG_ROLE, ARG_SUBJECT, ARG_USER_TYPE, CMD_ISSUE_TOKEN},
    vault,
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches(CMD_ISSUE_TOKEN) {
        return issue_token(sub);
    }

    commands::validate(matches).map_err(|e| anyhow!(e))?;

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let store_timeout = matches
        .get_one::<u64>(ARG_STORE_TIMEOUT_SECONDS)
        .copied()
        .unwrap_or(5);
    let rate_limit_window_minutes = matches
        .get_one::<u64>(ARG_RATE_LIMIT_WINDOW_MINUTES)
        .copied()
        .unwrap_or(1);

    Ok(Action::Server(server::Args {
        port,
        dsn: matches
            .get_one::<String>(ARG_DSN)
            .map(|dsn| SecretString::from(dsn.clone())),
        store_timeout: Duration::from_secs(store_timeout),
        frontend_origin: matches.get_one::<String>(ARG_FRONTEND_ORIGIN).cloned(),
        rate_limit_permits: matches
            .get_one::<u32>(ARG_RATE_LIMIT_PERMITS)
            .copied()
            .unwrap_or(100),
        rate_limit_window: Duration::from_secs(rate_limit_window_minutes.saturating_mul(60)),
        auth: auth::Options::parse(matches)?,
        vault: vault::Options::parse(matches)?,
    }))
}

fn issue_token(matches: &clap::ArgMatches) -> Result<Action> {
    commands::validate(matches).map_err(|e| anyhow!(e))?;

    let subject = matches
        .get_one::<uuid::Uuid>(ARG_SUBJECT)
        .copied()
        .context("missing required argument: --subject")?;
    let role = matches
        .get_one::<String>(ARG_ROLE)
        .cloned()
        .context("missing required argument: --role")?;
    let user_type = matches
        .get_one::<String>(ARG_USER_TYPE)
        .cloned()
        .context("missing required argument: --user-type")?;

    Ok(Action::IssueToken(token::Args {
        subject,
        role,
        user_type,
        nic: matches.get_one::<String>(ARG_NIC).cloned(),
        auth: auth::Options::parse(matches)?,
        vault: vault::Options::parse(matches)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEARED: [(&str, Option<&str>); 5] = [
        ("EVCHARGE_JWT_SECRET", None),
        ("EVCHARGE_VAULT_URL", None),
        ("EVCHARGE_VAULT_ROLE_ID", None),
        ("EVCHARGE_VAULT_SECRET_ID", None),
        ("EVCHARGE_DSN", None),
    ];

    #[test]
    fn server_without_secret_source_fails() {
        temp_env::with_vars(CLEARED, || {
            let matches = commands::new().get_matches_from(vec!["evcharge"]);
            let result = handler(&matches);
            assert!(
                matches!(result, Err(ref err) if err.to_string().contains("--jwt-secret"))
            );
        });
    }

    #[test]
    fn server_with_secret_uses_memory_store() {
        temp_env::with_vars(CLEARED, || {
            let matches = commands::new().get_matches_from(vec![
                "evcharge",
                "--jwt-secret",
                "0123456789abcdef0123456789abcdef",
                "--frontend-origin",
                "https://app.evcharge.dev",
            ]);
            let action = handler(&matches);
            assert!(matches!(
                action,
                Ok(Action::Server(server::Args {
                    dsn: None,
                    vault: None,
                    port: 8080,
                    rate_limit_permits: 100,
                    ..
                }))
            ));
        });
    }

    #[test]
    fn vault_url_requires_approle_credentials() {
        temp_env::with_vars(CLEARED, || {
            let matches = commands::new().get_matches_from(vec![
                "evcharge",
                "--vault-url",
                "https://vault.tld:8200/v1/auth/approle/login",
            ]);
            let result = handler(&matches);
            assert!(
                matches!(result, Err(ref err) if err.to_string().contains("--vault-role-id"))
            );
        });
    }

    #[test]
    fn issue_token_action() {
        temp_env::with_vars(CLEARED, || {
            let matches = commands::new().get_matches_from(vec![
                "evcharge",
                "--jwt-secret",
                "0123456789abcdef0123456789abcdef",
                "issue-token",
                "--subject",
                "6f1c2b8e-3d6a-4a53-9a9e-0d0f7f3f2b11",
                "--nic",
                "123456789V",
            ]);
            let action = handler(&matches);
            let Ok(Action::IssueToken(args)) = &action else {
                panic!("expected issue-token action, got {action:?}");
            };
            assert_eq!(args.role, "BackOffice");
            assert_eq!(args.nic.as_deref(), Some("123456789V"));
            assert!(args.auth.jwt_secret.is_some());
        });
    }
}
