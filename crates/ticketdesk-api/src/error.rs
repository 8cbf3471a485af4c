//! API error type
//!
//! Every handler and middleware returns [`ApiError`]; its `IntoResponse`
//! renders the `{ msg, code }` JSON body. Server-side failures are logged
//! with their detail and reach the client only as a generic message.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use thiserror::Error;
use ticketdesk_auth::{JwtError, PasswordError};
use tracing::error;
use validator::ValidationErrors;

use crate::models::ErrorResponse;

/// Message returned for every 500 response
pub const INTERNAL_ERROR_MSG: &str = "something went wrong, try again later";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation failure or malformed input (400)
    #[error("{msg}")]
    BadRequest { code: &'static str, msg: String },

    /// Missing or invalid session (401)
    #[error("{msg}")]
    Unauthenticated { code: &'static str, msg: String },

    /// Authenticated but not allowed: wrong role or not the owner (403)
    #[error("{msg}")]
    Unauthorized { code: &'static str, msg: String },

    /// Missing resource (404)
    #[error("{msg}")]
    NotFound { code: &'static str, msg: String },

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            msg: msg.into(),
        }
    }

    /// Generic validation failure
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::bad_request("VALIDATION_ERROR", msg)
    }

    pub fn unauthenticated(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::Unauthenticated {
            code,
            msg: msg.into(),
        }
    }

    pub fn unauthorized(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            code,
            msg: msg.into(),
        }
    }

    pub fn not_found(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::NotFound {
            code,
            msg: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. }
            | ApiError::Unauthenticated { code, .. }
            | ApiError::Unauthorized { code, .. }
            | ApiError::NotFound { code, .. } => code,
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            ApiError::Database(_) | ApiError::Internal(_) => {
                error!("Request failed: {}", self);
                INTERNAL_ERROR_MSG.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            msg,
            code: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("INVALID_JSON", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("INVALID_QUERY", rejection.body_text())
    }
}

/// The first failing field, in field-name order, supplies the message
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let msg = fields
            .iter()
            .flat_map(|(_, errs)| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| errors.to_string());

        Self::validation(msg)
    }
}
