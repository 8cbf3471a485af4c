//! Registration and login

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use ticketdesk_auth::{hash_password, verify_password, IssuedToken, SessionTokens};
use ticketdesk_db::entities::user::{self, UserRole};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::{email_exists, unique_email};
use crate::error::ApiError;
use crate::models::{LoginRequest, RegisterRequest};

fn invalid_credentials() -> ApiError {
    ApiError::unauthenticated("INVALID_CREDENTIALS", "invalid credentials")
}

/// Create a user account.
///
/// The first account ever created becomes an admin.
pub async fn register(
    db: &DatabaseConnection,
    request: RegisterRequest,
) -> Result<user::Model, ApiError> {
    let request = request.normalized();
    request.validate()?;

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(email_exists());
    }

    let role = if user::Entity::find().count(db).await? == 0 {
        UserRole::Admin
    } else {
        UserRole::User
    };

    let password_hash = hash_password(&request.password)?;
    let now = Utc::now();

    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(request.name),
        last_name: Set(request.last_name),
        email: Set(request.email),
        password_hash: Set(password_hash),
        role: Set(role),
        location: Set(request.location),
        avatar: Set(None),
        avatar_public_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(unique_email)?;

    info!("Registered user {} ({}) as {}", created.id, created.email, role.as_str());

    Ok(created)
}

/// Check credentials and issue a session token.
///
/// An unknown email and a wrong password fail identically.
pub async fn login(
    db: &DatabaseConnection,
    tokens: &SessionTokens,
    request: LoginRequest,
) -> Result<(user::Model, IssuedToken), ApiError> {
    let request = request.normalized();
    request.validate()?;

    let Some(user) = user::Entity::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(db)
        .await?
    else {
        warn!("Login attempt for unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(&request.password, &user.password_hash)? {
        warn!("Login attempt with wrong password for user {}", user.id);
        return Err(invalid_credentials());
    }

    let issued = tokens.issue(&user.id.to_string(), user.role.as_str())?;
    info!("User {} logged in", user.id);

    Ok((user, issued))
}
