//! Profile and application-wide user operations

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use ticketdesk_db::entities::{ticket, user};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::{email_exists, unique_email};
use crate::error::ApiError;
use crate::models::UpdateUserRequest;

pub async fn current_user(db: &DatabaseConnection, user_id: Uuid) -> Result<user::Model, ApiError> {
    debug!("Loading user {}", user_id);

    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "user not found"))
}

/// Replace the profile fields of the calling user.
///
/// Role and password are never touched here.
pub async fn update_current_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    request: UpdateUserRequest,
) -> Result<user::Model, ApiError> {
    let request = request.normalized();
    request.validate()?;

    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(&request.email))
        .filter(user::Column::Id.ne(user_id))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(email_exists());
    }

    let existing = current_user(db, user_id).await?;
    let mut active: user::ActiveModel = existing.into();

    active.name = Set(request.name);
    active.last_name = Set(request.last_name);
    active.email = Set(request.email);
    active.location = Set(request.location);
    if let Some(avatar) = request.avatar {
        active.avatar = Set(Some(avatar));
        active.avatar_public_id = Set(request.avatar_public_id);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await.map_err(unique_email)?;
    info!("User {} updated their profile", user_id);

    Ok(updated)
}

/// Total users and total tickets
pub async fn app_stats(db: &DatabaseConnection) -> Result<(u64, u64), ApiError> {
    let users = user::Entity::find().count(db).await?;
    let tickets = ticket::Entity::find().count(db).await?;

    Ok((users, tickets))
}
