//! Credential verification and session lifecycle.
//!
//! ## Tokens
//!
//! - **Access token:** HS256 JWT with `sub`, `role`, `user_type`, `jti`, `iat`,
//!   `exp`, `iss`, `aud` and an optional `nic`. Stateless; never stored.
//! - **Refresh token:** 32 random bytes, base64url. Stateful; the session
//!   store keeps only its SHA-256 digest.
//!
//! ## Rotation
//!
//! Every refresh replaces the refresh token on the same session record. There
//! is no grace window: a response lost in transit leaves the client holding a
//! dead token and it must log in again.

pub mod config;
pub mod password;
pub mod principal;
pub mod role;
pub mod service;
pub mod token;

pub use config::{AuthConfig, ConfigError};
pub use principal::Principal;
pub use role::Role;
pub use service::{AuthService, TokenPair};
pub use token::{AccessClaims, IssuedToken, TokenError, TokenIssuer};

/// Owner-type tag recorded on sessions created by owner login.
pub const USER_TYPE_EV_OWNER: &str = "EVOwner";
