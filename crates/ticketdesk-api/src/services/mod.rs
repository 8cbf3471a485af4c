//! Business logic behind the handlers
//!
//! Services take plain request data and the database connection, enforce
//! validation and ownership, and return entity models. They know nothing
//! about HTTP beyond [`ApiError`].

pub mod auth;
pub mod tickets;
pub mod users;

use sea_orm::{DbErr, SqlErr};
use std::str::FromStr;

use ticketdesk_db::entities::ticket::UnknownValue;

use crate::error::ApiError;

/// Trimmed value of a required text field
pub(crate) fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("please provide {}", field)));
    }
    Ok(value.to_string())
}

pub(crate) fn email_exists() -> ApiError {
    ApiError::bad_request("EMAIL_EXISTS", "email already exists")
}

/// Map a write that lost a race on the unique email index to `EMAIL_EXISTS`
pub(crate) fn unique_email(err: DbErr) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => email_exists(),
        _ => ApiError::Database(err),
    }
}

/// Parse a canonical enum value supplied by a client
pub(crate) fn canonical<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = UnknownValue>,
{
    raw.trim()
        .parse()
        .map_err(|e: UnknownValue| ApiError::validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketdesk_db::entities::ticket::TicketStatus;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Lucy ").unwrap(), "Lucy");
        let err = required("name", "   ").unwrap_err();
        assert_eq!(err.to_string(), "please provide name");
    }

    #[tokio::test]
    async fn test_unique_email_violation_maps_to_email_exists() {
        use chrono::Utc;
        use sea_orm::{ActiveModelTrait, Set};
        use ticketdesk_db::entities::user::{self, UserRole};
        use uuid::Uuid;

        let db = ticketdesk_db::connect("sqlite::memory:").await.unwrap();
        ticketdesk_db::migrate(&db).await.unwrap();

        let account = || {
            let now = Utc::now();
            user::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set("Lucy".to_string()),
                last_name: Set("King".to_string()),
                email: Set("lucy@example.com".to_string()),
                password_hash: Set("hash".to_string()),
                role: Set(UserRole::User),
                location: Set("Main Site".to_string()),
                avatar: Set(None),
                avatar_public_id: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
        };

        account().insert(&db).await.unwrap();
        let err = account().insert(&db).await.unwrap_err();

        let err = unique_email(err);
        assert_eq!(err.code(), "EMAIL_EXISTS");
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_other_database_errors_stay_internal() {
        let err = unique_email(DbErr::Custom("disk full".to_string()));
        assert_eq!(err.code(), "INTERNAL");
    }

    #[test]
    fn test_canonical_rejects_legacy_spelling() {
        assert_eq!(canonical::<TicketStatus>("in-progress").unwrap(), TicketStatus::InProgress);

        let err = canonical::<TicketStatus>("pending").unwrap_err();
        assert_eq!(err.to_string(), "invalid status value 'pending'");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
