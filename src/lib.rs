//! # EVCharge (Owner Accounts & Session Authority)
//!
//! `evcharge` manages electric-vehicle owner accounts and cookie-based session
//! authentication for a charging platform.
//!
//! ## Sessions
//!
//! Login issues a short-lived signed access token (HS256 JWT) and an opaque
//! refresh token. The refresh token is a store-backed capability: the database
//! only keeps its SHA-256 digest, and every refresh rotates it in place with a
//! single conditional write, so two concurrent refreshes presenting the same
//! value can never both succeed.
//!
//! Both tokens travel in `HttpOnly` cookies. A request-level interceptor renews
//! access tokens that are within five minutes of expiring, transparently to the
//! caller.
//!
//! ## Error Messages
//!
//! Login failures never reveal which credential check failed. Refresh failures
//! look the same whether the token was unknown or merely expired.

pub mod api;
pub mod auth;
pub mod cli;
pub mod error;
pub mod owners;
pub mod store;
pub mod vault;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
