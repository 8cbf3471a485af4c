//! API Middleware
//!
//! Session authentication and role checks.

pub mod auth;

pub use auth::{require_admin, require_auth, AuthUser, SessionState};
