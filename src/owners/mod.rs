//! EV owner accounts.

pub mod service;
pub mod validation;

pub use service::{OwnerService, Registration};
