//! Ticket entity (ticket store)
//!
//! Every enum column is stored as its kebab-case string. Only the canonical
//! values below are representable; older spellings are handled by
//! [`crate::legacy`] and never reach a `Model`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Location stored when a ticket is created without one
pub const DEFAULT_LOCATION: &str = "my city";

/// A string that is not a canonical value of an enum column
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} value '{value}'")]
pub struct UnknownValue {
    pub field: &'static str,
    pub value: String,
}

impl UnknownValue {
    pub fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Ticket workflow status
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "kebab-case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TicketStatus {
    #[default]
    #[sea_orm(string_value = "open")]
    Open,

    #[sea_orm(string_value = "in-progress")]
    InProgress,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in-progress" => Ok(TicketStatus::InProgress),
            "cancelled" => Ok(TicketStatus::Cancelled),
            other => Err(UnknownValue::new("status", other)),
        }
    }
}

/// Ticket priority: how urgently, and in what mode, the work is scheduled
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "kebab-case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TicketPriority {
    #[default]
    #[sea_orm(string_value = "high-priority")]
    HighPriority,

    #[sea_orm(string_value = "routine")]
    Routine,

    #[sea_orm(string_value = "emergency")]
    Emergency,

    /// Scheduled upkeep; unrelated to [`TicketCategory::Maintenance`]
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::HighPriority => "high-priority",
            TicketPriority::Routine => "routine",
            TicketPriority::Emergency => "emergency",
            TicketPriority::Maintenance => "maintenance",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high-priority" => Ok(TicketPriority::HighPriority),
            "routine" => Ok(TicketPriority::Routine),
            "emergency" => Ok(TicketPriority::Emergency),
            "maintenance" => Ok(TicketPriority::Maintenance),
            other => Err(UnknownValue::new("priority", other)),
        }
    }
}

/// Business line a ticket belongs to
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "kebab-case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TicketCategory {
    #[default]
    #[sea_orm(string_value = "maintenance")]
    Maintenance,

    #[sea_orm(string_value = "order-fulfillment")]
    OrderFulfillment,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Maintenance => "maintenance",
            TicketCategory::OrderFulfillment => "order-fulfillment",
        }
    }
}

impl FromStr for TicketCategory {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maintenance" => Ok(TicketCategory::Maintenance),
            "order-fulfillment" => Ok(TicketCategory::OrderFulfillment),
            other => Err(UnknownValue::new("category", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    /// Ticket UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Task, issue or order reference
    pub subject: String,

    /// Property, vendor or customer the ticket is about
    pub entity: String,

    /// Zone or area
    pub location: String,

    pub status: TicketStatus,

    pub priority: TicketPriority,

    pub category: TicketCategory,

    /// User who created (and owns) the ticket
    pub owner_id: Uuid,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Ticket belongs to its owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "NoAction"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
