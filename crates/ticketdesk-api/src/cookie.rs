//! Session cookie
//!
//! The session token travels in an http-only cookie named `token`. Flags
//! depend on the deployment: production uses `SameSite=None; Secure` so a
//! separately hosted client can send it, development uses `SameSite=Strict`
//! over plain HTTP.

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};

use crate::error::ApiError;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "token";

/// Value written over the session cookie on logout
pub const LOGOUT_VALUE: &str = "logout";

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Flags applied to every session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: &'static str,
}

impl CookiePolicy {
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_production() {
            Self {
                secure: true,
                same_site: "None",
            }
        } else {
            Self {
                secure: false,
                same_site: "Strict",
            }
        }
    }

    /// `Set-Cookie` value carrying a freshly issued session token
    pub fn session_cookie(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<HeaderValue, ApiError> {
        self.render(token, expires_at)
    }

    /// `Set-Cookie` value that replaces the session with an expired placeholder
    pub fn logout_cookie(&self) -> Result<HeaderValue, ApiError> {
        self.render(LOGOUT_VALUE, Utc::now())
    }

    fn render(&self, value: &str, expires_at: DateTime<Utc>) -> Result<HeaderValue, ApiError> {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; Expires={}; SameSite={}",
            SESSION_COOKIE,
            value,
            expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.same_site
        );
        if self.secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::Internal(format!("invalid cookie value: {}", e)))
    }
}

/// Find the session token in a `Cookie` request header
pub fn session_token(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .map(|c| c.trim())
        .filter_map(|c| c.split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty() && *value != LOGOUT_VALUE)
}
