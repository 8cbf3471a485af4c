//! Request and response bodies
//!
//! Wire format is camelCase JSON. Ticket request bodies also accept the field
//! names of the job-tracker client (`position`, `company`, `jobLocation`,
//! `jobStatus`, `jobType`, `ticketCategory`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub use ticketdesk_db::entities::ticket::{TicketCategory, TicketPriority, TicketStatus};
pub use ticketdesk_db::entities::user::UserRole;

use ticketdesk_db::entities::{ticket, user};

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message
    pub msg: String,
    /// Machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Response carrying only a message
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub msg: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Server time
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server started
    pub uptime: f64,
}

// ---------------------------------------------------------------------------
// Users and authentication
// ---------------------------------------------------------------------------

/// Request to register a new user
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "please provide name"))]
    pub name: String,
    #[validate(length(min = 1, message = "please provide last name"))]
    pub last_name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    /// At least 8 characters
    #[validate(length(min = 8, message = "password must be at least 8 characters long"))]
    pub password: String,
    #[validate(length(min = 1, message = "please provide location"))]
    pub location: String,
}

impl RegisterRequest {
    /// Trim text fields and lowercase the email; the password is kept as sent
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
            location: self.location.trim().to_string(),
        }
    }
}

/// Request to log in
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "please provide password"))]
    pub password: String,
}

impl LoginRequest {
    pub fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

/// Request to update the current user's profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "please provide name"))]
    pub name: String,
    #[validate(length(min = 1, message = "please provide last name"))]
    pub last_name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "please provide location"))]
    pub location: String,
    /// Avatar image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "invalid avatar url"))]
    pub avatar: Option<String>,
    /// Identifier of the avatar at the image host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_public_id: Option<String>,
}

impl UpdateUserRequest {
    /// Trim text fields, lowercase the email and drop a blank avatar
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            location: self.location.trim().to_string(),
            avatar: self
                .avatar
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            avatar_public_id: self.avatar_public_id,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User information (never includes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            last_name: model.last_name,
            email: model.email,
            role: model.role,
            location: model.location,
            avatar: model.avatar,
            avatar_public_id: model.avatar_public_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Response wrapping a single user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub msg: String,
    pub user: User,
}

/// Application-wide counters (admin only)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppStatsResponse {
    pub msg: String,
    /// Registered users
    pub users: u64,
    /// Tickets across all users
    pub tickets: u64,
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// Ticket information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub subject: String,
    pub entity: String,
    pub location: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category: TicketCategory,
    /// ID of the user who owns the ticket
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ticket::Model> for Ticket {
    fn from(model: ticket::Model) -> Self {
        Self {
            id: model.id,
            subject: model.subject,
            entity: model.entity,
            location: model.location,
            status: model.status,
            priority: model.priority,
            category: model.category,
            owner: model.owner_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Request to create a ticket
///
/// Enum fields are validated by the service so that an unknown value is
/// reported by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTicketRequest {
    #[serde(alias = "position")]
    pub subject: String,
    #[serde(alias = "company")]
    pub entity: String,
    /// Defaults to "my city"
    #[serde(alias = "jobLocation", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// open | in-progress | cancelled
    #[serde(alias = "jobStatus", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// high-priority | routine | emergency | maintenance
    #[serde(alias = "jobType", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// maintenance | order-fulfillment
    #[serde(alias = "ticketCategory", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Partial update of a ticket; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTicketRequest {
    #[serde(alias = "position", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(alias = "company", skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(alias = "jobLocation", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(alias = "jobStatus", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(alias = "jobType", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(alias = "ticketCategory", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Query parameters of the ticket list
///
/// Everything arrives as text; `page` and `limit` fall back to their
/// defaults when they do not parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "jobStatus", alias = "status", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "jobType", alias = "priority", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(
        rename = "ticketCategory",
        alias = "category",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

/// Response wrapping a single ticket
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketResponse {
    pub msg: String,
    pub ticket: Ticket,
}

/// One page of tickets
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketList {
    pub msg: String,
    /// Tickets matching the filters, across all pages
    pub total_tickets: u64,
    pub num_of_pages: u64,
    pub current_page: u64,
    pub tickets: Vec<Ticket>,
}

/// Ticket counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DefaultStats {
    pub open: u64,
    #[serde(rename = "in-progress")]
    pub in_progress: u64,
    pub cancelled: u64,
}

/// Ticket counts per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub maintenance: u64,
    pub order_fulfillment: u64,
}

/// Tickets created in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyCount {
    /// Month label, e.g. "Jan 25"
    pub date: String,
    pub count: u64,
}

/// Aggregate statistics over the caller's tickets
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub msg: String,
    pub default_stats: DefaultStats,
    pub category_stats: CategoryStats,
    /// Up to six most recent months, oldest first
    pub monthly_tickets: Vec<MonthlyCount>,
}
