use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_ISSUER: &str = "jwt-issuer";
pub const ARG_JWT_AUDIENCE: &str = "jwt-audience";
pub const ARG_ACCESS_TOKEN_MINUTES: &str = "access-token-minutes";
pub const ARG_REFRESH_TOKEN_DAYS: &str = "refresh-token-days";
pub const ARG_ACCESS_COOKIE_PATH: &str = "access-cookie-path";
pub const ARG_REFRESH_COOKIE_PATH: &str = "refresh-cookie-path";

/// Token settings shared by the server and `issue-token`.
#[derive(Debug, Clone)]
pub struct Options {
    pub jwt_secret: Option<SecretString>,
    pub issuer: String,
    pub audience: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub access_cookie_path: String,
    pub refresh_cookie_path: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is unexpectedly missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let string = |id: &str| -> Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };
        let number = |id: &str| -> Result<i64> {
            matches
                .get_one::<i64>(id)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            jwt_secret: matches
                .get_one::<String>(ARG_JWT_SECRET)
                .map(|secret| SecretString::from(secret.clone())),
            issuer: string(ARG_JWT_ISSUER)?,
            audience: string(ARG_JWT_AUDIENCE)?,
            access_token_minutes: number(ARG_ACCESS_TOKEN_MINUTES)?,
            refresh_token_days: number(ARG_REFRESH_TOKEN_DAYS)?,
            access_cookie_path: string(ARG_ACCESS_COOKIE_PATH)?,
            refresh_cookie_path: string(ARG_REFRESH_COOKIE_PATH)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HS256 signing secret, at least 32 bytes (read from Vault when omitted)")
                .env("EVCHARGE_JWT_SECRET")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_JWT_ISSUER)
                .long(ARG_JWT_ISSUER)
                .help("Access token issuer")
                .env("EVCHARGE_JWT_ISSUER")
                .default_value("evcharge")
                .global(true),
        )
        .arg(
            Arg::new(ARG_JWT_AUDIENCE)
                .long(ARG_JWT_AUDIENCE)
                .help("Access token audience")
                .env("EVCHARGE_JWT_AUDIENCE")
                .default_value("evcharge-clients")
                .global(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_MINUTES)
                .long(ARG_ACCESS_TOKEN_MINUTES)
                .help("Access token lifetime in minutes")
                .env("EVCHARGE_ACCESS_TOKEN_MINUTES")
                .default_value("15")
                .value_parser(clap::value_parser!(i64))
                .global(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_DAYS)
                .long(ARG_REFRESH_TOKEN_DAYS)
                .help("Refresh token lifetime in days")
                .env("EVCHARGE_REFRESH_TOKEN_DAYS")
                .default_value("7")
                .value_parser(clap::value_parser!(i64))
                .global(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_COOKIE_PATH)
                .long(ARG_ACCESS_COOKIE_PATH)
                .help("Path attribute of the accessToken cookie")
                .env("EVCHARGE_ACCESS_COOKIE_PATH")
                .default_value("/api")
                .global(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_COOKIE_PATH)
                .long(ARG_REFRESH_COOKIE_PATH)
                .help("Path attribute of the refreshToken cookie")
                .env("EVCHARGE_REFRESH_COOKIE_PATH")
                .default_value("/api/auth/refresh")
                .global(true),
        )
}
