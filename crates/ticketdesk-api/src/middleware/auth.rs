//! Session Authentication Middleware
//!
//! Extracts the session token from the `token` cookie (browsers) or the
//! `Authorization: Bearer` header (API clients), validates it, and makes the
//! caller's identity available to handlers via Axum's Extension.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticketdesk_auth::SessionTokens;
use tracing::warn;
use uuid::Uuid;

use crate::cookie;
use crate::error::ApiError;
use crate::models::UserRole;

/// Message of every rejected session
pub const AUTHENTICATION_INVALID: &str = "authentication invalid";

/// Authenticated caller extracted from the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Token verification state shared across middleware instances
#[derive(Clone)]
pub struct SessionState {
    pub tokens: Arc<SessionTokens>,
}

impl SessionState {
    pub fn new(tokens: Arc<SessionTokens>) -> Self {
        Self { tokens }
    }
}

fn rejected() -> ApiError {
    ApiError::unauthenticated("AUTHENTICATION_INVALID", AUTHENTICATION_INVALID)
}

/// Authentication middleware for every non-public route
///
/// # Errors
/// Returns 401 `authentication invalid` when no token is present, the token
/// is malformed, signed with another secret or expired, or its claims do not
/// name a user id and a known role.
pub async fn require_auth(
    State(state): State<SessionState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Cookie first (web client), then Authorization header (API clients)
    let from_cookie = request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(cookie::session_token)
        .map(str::to_string);

    let token = match from_cookie {
        Some(token) => token,
        None => request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .ok_or_else(rejected)?,
    };

    let claims = state.tokens.verify(&token).map_err(|e| {
        warn!("Rejected session token: {}", e);
        rejected()
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        warn!("Session token subject is not a user id: {}", claims.sub);
        rejected()
    })?;
    let role = claims.role.parse::<UserRole>().map_err(|e| {
        warn!("Session token carries {}", e);
        rejected()
    })?;

    request.extensions_mut().insert(AuthUser { user_id, role });

    Ok(next.run(request).await)
}

/// Role middleware for admin-only routes; must run inside [`require_auth`]
pub async fn require_admin(
    Extension(user): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !user.is_admin() {
        warn!("User {} denied access to {}", user.user_id, request.uri().path());
        return Err(ApiError::unauthorized(
            "FORBIDDEN",
            "Unauthorized to access this route",
        ));
    }

    Ok(next.run(request).await)
}
