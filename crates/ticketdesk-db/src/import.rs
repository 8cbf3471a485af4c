//! Bulk ticket import
//!
//! Replaces every ticket of one owner with a batch of records, typically a
//! JSON export from the previous job-tracker deployment. Records may use the
//! old field names and the old enum spellings.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    TransactionTrait,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::entities::ticket::{self, UnknownValue, DEFAULT_LOCATION};
use crate::legacy;

/// One ticket as found in an import file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTicket {
    #[serde(alias = "position")]
    pub subject: String,
    #[serde(alias = "company")]
    pub entity: String,
    #[serde(default, alias = "jobLocation")]
    pub location: Option<String>,
    #[serde(default, alias = "jobStatus")]
    pub status: Option<String>,
    #[serde(default, alias = "jobType")]
    pub priority: Option<String>,
    #[serde(default, alias = "ticketCategory")]
    pub category: Option<String>,
    /// Keeps historical creation dates so monthly statistics survive the import
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("record {index}: {source}")]
    InvalidValue { index: usize, source: UnknownValue },

    #[error("record {index}: {field} must not be empty")]
    MissingField { index: usize, field: &'static str },

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl ImportTicket {
    fn into_active_model(
        self,
        index: usize,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ticket::ActiveModel, ImportError> {
        let subject = required(self.subject, index, "subject")?;
        let entity = required(self.entity, index, "entity")?;
        let invalid = |source: UnknownValue| ImportError::InvalidValue { index, source };

        let status = match self.status.as_deref() {
            Some(raw) => legacy::resolve_status(raw).map_err(invalid)?,
            None => Default::default(),
        };
        let priority = match self.priority.as_deref() {
            Some(raw) => legacy::resolve_priority(raw).map_err(invalid)?,
            None => Default::default(),
        };
        let category = match self.category.as_deref() {
            Some(raw) => legacy::resolve_category(raw).map_err(invalid)?,
            None => Default::default(),
        };
        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let created_at = self.created_at.unwrap_or(now);

        Ok(ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            subject: Set(subject),
            entity: Set(entity),
            location: Set(location),
            status: Set(status),
            priority: Set(priority),
            category: Set(category),
            owner_id: Set(owner_id),
            created_at: Set(created_at),
            updated_at: Set(created_at),
        })
    }
}

fn required(value: String, index: usize, field: &'static str) -> Result<String, ImportError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ImportError::MissingField { index, field });
    }
    Ok(value.to_string())
}

/// Replace all tickets of `owner_id` with `records`.
///
/// Every record is validated before anything is written; the delete and the
/// inserts share one transaction. Returns the number of tickets inserted.
pub async fn import_tickets(
    db: &DatabaseConnection,
    owner_id: Uuid,
    records: Vec<ImportTicket>,
) -> Result<u64, ImportError> {
    let now = Utc::now();
    let models = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_active_model(index, owner_id, now))
        .collect::<Result<Vec<_>, _>>()?;
    let count = models.len() as u64;

    let txn = db.begin().await?;

    let removed = ticket::Entity::delete_many()
        .filter(ticket::Column::OwnerId.eq(owner_id))
        .exec(&txn)
        .await?;

    if !models.is_empty() {
        ticket::Entity::insert_many(models).exec(&txn).await?;
    }

    txn.commit().await?;

    info!(
        "Imported {} tickets for owner {} (replaced {})",
        count, owner_id, removed.rows_affected
    );

    Ok(count)
}
