//! HTTP handlers for the owner and session endpoints.

pub mod auth;
pub mod health;
pub mod owners;
