//! Auth module: single-admin session gateway (domain, errors, service).
//!
//! The gateway issues HS256-signed session tokens that carry a server-side
//! session id, so logout takes effect immediately.

pub mod domain;
pub mod errors;
pub mod service;

pub use errors::AuthError;
pub use service::{AuthConfig, AuthService};
