//! Session endpoints and their supporting pieces.
//!
//! ## Cookies
//!
//! Both tokens are delivered as `HttpOnly; Secure; SameSite=None` cookies:
//! `accessToken` scoped to the API prefix and `refreshToken` scoped to the
//! refresh endpoint. Response bodies carry only expiry metadata.
//!
//! ## In-flight renewal
//!
//! [`refresh_layer::refresh_tokens`] renews an access token that is about to
//! expire before the request reaches its handler.

pub(crate) mod cookies;
pub(crate) mod login;
pub(crate) mod logout;
mod principal;
pub(crate) mod refresh;
pub(crate) mod refresh_layer;
pub(crate) mod types;
