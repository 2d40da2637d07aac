//! Vault access for the JWT signing secret.
//!
//! The server logs in with AppRole against the configured login URL and reads
//! one field from a KV-v2 secret. The base address for every other request is
//! derived from that login URL.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{Instrument, debug, info_span, instrument};
use url::Url;

use crate::APP_USER_AGENT;

pub const SIGNING_SECRET_FIELD: &str = "jwt_signing_secret";

/// Build `scheme://host:port{endpoint}` from any URL on the Vault server.
///
/// # Errors
/// Returns an error if the URL has no host or an unsupported scheme.
#[instrument]
pub fn endpoint_url(vault_url: &str, endpoint: &str) -> Result<String> {
    let url = Url::parse(vault_url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
        },
    };

    let endpoint_url = format!("{scheme}://{host}:{port}{endpoint}");

    debug!("endpoint URL: {}", endpoint_url);

    Ok(endpoint_url)
}

fn client() -> Result<Client> {
    Ok(Client::builder().user_agent(APP_USER_AGENT).build()?)
}

async fn error_message(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap_or_default();
    body["errors"][0].as_str().unwrap_or_default().to_string()
}

/// Login to Vault using AppRole and return the client token.
///
/// The token is used once at startup, so its lease is not tracked.
///
/// # Errors
/// Returns an error if the request fails or the response has no client token.
#[instrument(skip(secret_id))]
pub async fn approle_login(
    login_url: &str,
    secret_id: &SecretString,
    role_id: &str,
) -> Result<SecretString> {
    let login_payload = json!({
        "role_id": role_id,
        "secret_id": secret_id.expose_secret(),
    });

    let span = info_span!("vault.login", http.method = "POST", url = %login_url);
    let response = client()?
        .post(login_url)
        .json(&login_payload)
        .send()
        .instrument(span)
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(anyhow!(
            "{} - {}, {}",
            login_url,
            status,
            error_message(response).await
        ));
    }

    let json_response: Value = response.json().await?;
    client_token(&json_response)
}

/// Read one string field from a KV-v2 secret.
///
/// # Errors
/// Returns an error if the request fails or the field is missing or empty.
#[instrument(skip(token))]
pub async fn read_kv_field(
    vault_url: &str,
    token: &SecretString,
    kv_mount: &str,
    kv_path: &str,
    field: &str,
) -> Result<SecretString> {
    let url = endpoint_url(vault_url, &kv_data_path(kv_mount, kv_path))?;

    let span = info_span!("vault.kv.read", http.method = "GET", url = %url);
    let response = client()?
        .get(&url)
        .header("X-Vault-Token", token.expose_secret())
        .send()
        .instrument(span)
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(anyhow!(
            "vault kv read failed: {status} {}",
            error_message(response).await
        ));
    }

    let json: Value = response.json().await?;
    extract_kv_field(&json, field)
}

/// Login with AppRole and fetch the JWT signing secret.
///
/// # Errors
/// Returns an error if the login or the KV read fails.
pub async fn fetch_signing_secret(
    login_url: &str,
    role_id: &str,
    secret_id: &SecretString,
    kv_mount: &str,
    kv_path: &str,
) -> Result<SecretString> {
    let token = approle_login(login_url, secret_id, role_id)
        .await
        .context("Vault AppRole login failed")?;
    read_kv_field(login_url, &token, kv_mount, kv_path, SIGNING_SECRET_FIELD)
        .await
        .context("Failed to read JWT signing secret from Vault")
}

fn kv_data_path(kv_mount: &str, kv_path: &str) -> String {
    format!(
        "/v1/{}/data/{}",
        kv_mount.trim_matches('/'),
        kv_path.trim_matches('/')
    )
}

fn client_token(json: &Value) -> Result<SecretString> {
    json["auth"]["client_token"]
        .as_str()
        .filter(|token| !token.is_empty())
        .map(|token| SecretString::from(token.to_string()))
        .ok_or_else(|| anyhow!("Error parsing JSON response: no client_token found"))
}

fn extract_kv_field(json: &Value, field: &str) -> Result<SecretString> {
    let value = json
        .get("data")
        .and_then(|data| data.get("data"))
        .and_then(|data| data.get(field))
        .and_then(Value::as_str)
        .with_context(|| format!("{field} missing from vault response"))?;
    if value.is_empty() {
        return Err(anyhow!("{field} is empty in vault response"));
    }
    Ok(SecretString::from(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_fills_default_ports() -> Result<()> {
        assert_eq!(
            endpoint_url("https://vault.tld/v1/auth/approle/login", "/v1/secret/data/x")?,
            "https://vault.tld:443/v1/secret/data/x"
        );
        assert_eq!(
            endpoint_url("http://127.0.0.1:8200/v1/auth/approle/login", "/v1/sys/health")?,
            "http://127.0.0.1:8200/v1/sys/health"
        );
        Ok(())
    }

    #[test]
    fn endpoint_url_rejects_unknown_scheme() {
        assert!(endpoint_url("ftp://vault.tld", "/v1").is_err());
        assert!(endpoint_url("not a url", "/v1").is_err());
    }

    #[test]
    fn kv_data_path_trims_slashes() {
        assert_eq!(
            kv_data_path("/secret/", "/evcharge/"),
            "/v1/secret/data/evcharge"
        );
    }

    #[test]
    fn client_token_from_login_response() -> Result<()> {
        let body = json!({ "auth": { "client_token": "hvs.abc", "lease_duration": 2764800 } });
        assert_eq!(client_token(&body)?.expose_secret(), "hvs.abc");
        assert!(client_token(&json!({ "auth": { "client_token": "" } })).is_err());
        assert!(client_token(&json!({ "errors": ["permission denied"] })).is_err());
        Ok(())
    }

    #[test]
    fn extract_kv_field_reads_nested_data() -> Result<()> {
        let body = json!({ "data": { "data": { "jwt_signing_secret": "s3cr3t" } } });
        let secret = extract_kv_field(&body, SIGNING_SECRET_FIELD)?;
        assert_eq!(secret.expose_secret(), "s3cr3t");

        let empty = json!({ "data": { "data": { "jwt_signing_secret": "" } } });
        assert!(extract_kv_field(&empty, SIGNING_SECRET_FIELD).is_err());
        assert!(extract_kv_field(&json!({}), SIGNING_SECRET_FIELD).is_err());
        Ok(())
    }
}
