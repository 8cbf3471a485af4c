//! Legacy enum spellings
//!
//! Earlier revisions of the product stored job-tracker and property-rental
//! spellings in the status and priority columns. Those spellings are accepted
//! in exactly three places: the one-shot [`migrate_legacy_values`] rewrite,
//! bulk [`crate::import`], and the statistics fold, which must still count
//! rows that have not been migrated yet. Everything else works on the
//! canonical enums only, so `serve` runs the rewrite before accepting
//! requests.

use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Iterable,
    PaginatorTrait, QueryFilter, TransactionTrait,
};
use tracing::{info, warn};

use crate::entities::ticket::{
    self, TicketCategory, TicketPriority, TicketStatus, UnknownValue,
};

/// Old status spellings and the canonical status each one means
pub const STATUS_ALIASES: &[(&str, TicketStatus)] = &[
    ("pending", TicketStatus::Open),
    ("interview", TicketStatus::InProgress),
    ("declined", TicketStatus::Cancelled),
    ("maintenance", TicketStatus::Open),
    ("active", TicketStatus::InProgress),
    ("inactive", TicketStatus::Cancelled),
];

/// Old priority spellings and the canonical priority each one means
pub const PRIORITY_ALIASES: &[(&str, TicketPriority)] = &[
    ("full-time", TicketPriority::HighPriority),
    ("part-time", TicketPriority::Routine),
    ("remote", TicketPriority::Maintenance),
    ("internship", TicketPriority::Emergency),
];

/// Resolve a stored or imported status, accepting legacy spellings
pub fn resolve_status(raw: &str) -> Result<TicketStatus, UnknownValue> {
    raw.parse().or_else(|err| {
        STATUS_ALIASES
            .iter()
            .find(|(alias, _)| *alias == raw)
            .map(|(_, status)| *status)
            .ok_or(err)
    })
}

/// Resolve a stored or imported priority, accepting legacy spellings
pub fn resolve_priority(raw: &str) -> Result<TicketPriority, UnknownValue> {
    raw.parse().or_else(|err| {
        PRIORITY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == raw)
            .map(|(_, priority)| *priority)
            .ok_or(err)
    })
}

/// Resolve a stored or imported category; rows from before categories
/// existed carry an empty value and count as maintenance.
pub fn resolve_category(raw: &str) -> Result<TicketCategory, UnknownValue> {
    if raw.is_empty() {
        return Ok(TicketCategory::Maintenance);
    }
    raw.parse()
}

/// One alias rewritten by [`migrate_legacy_values`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub column: &'static str,
    pub from: &'static str,
    pub to: &'static str,
    pub rows: u64,
}

/// Outcome of [`migrate_legacy_values`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyMigrationReport {
    /// Aliases that matched at least one row
    pub rewrites: Vec<Rewrite>,
    /// Rows whose status is neither canonical nor a known alias
    pub unresolved_status: u64,
    /// Rows whose priority is neither canonical nor a known alias
    pub unresolved_priority: u64,
    /// Rows whose category is neither canonical nor empty
    pub unresolved_category: u64,
}

impl LegacyMigrationReport {
    pub fn rows_rewritten(&self) -> u64 {
        self.rewrites.iter().map(|r| r.rows).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.unresolved_status == 0 && self.unresolved_priority == 0 && self.unresolved_category == 0
    }
}

/// Rewrite every legacy status/priority spelling to its canonical value.
///
/// Runs in one transaction and is idempotent: a second run rewrites nothing.
pub async fn migrate_legacy_values(
    db: &DatabaseConnection,
) -> Result<LegacyMigrationReport, DbErr> {
    let txn = db.begin().await?;
    let mut report = LegacyMigrationReport::default();

    for (alias, status) in STATUS_ALIASES {
        let result = ticket::Entity::update_many()
            .col_expr(ticket::Column::Status, Expr::value(status.as_str()))
            .filter(ticket::Column::Status.eq(*alias))
            .exec(&txn)
            .await?;

        if result.rows_affected > 0 {
            info!(
                "Rewrote status '{}' -> '{}' on {} tickets",
                alias,
                status.as_str(),
                result.rows_affected
            );
            report.rewrites.push(Rewrite {
                column: "status",
                from: alias,
                to: status.as_str(),
                rows: result.rows_affected,
            });
        }
    }

    for (alias, priority) in PRIORITY_ALIASES {
        let result = ticket::Entity::update_many()
            .col_expr(ticket::Column::Priority, Expr::value(priority.as_str()))
            .filter(ticket::Column::Priority.eq(*alias))
            .exec(&txn)
            .await?;

        if result.rows_affected > 0 {
            info!(
                "Rewrote priority '{}' -> '{}' on {} tickets",
                alias,
                priority.as_str(),
                result.rows_affected
            );
            report.rewrites.push(Rewrite {
                column: "priority",
                from: alias,
                to: priority.as_str(),
                rows: result.rows_affected,
            });
        }
    }

    // Rows from before categories existed
    let result = ticket::Entity::update_many()
        .col_expr(
            ticket::Column::Category,
            Expr::value(TicketCategory::Maintenance.as_str()),
        )
        .filter(ticket::Column::Category.eq(""))
        .exec(&txn)
        .await?;

    if result.rows_affected > 0 {
        info!(
            "Filled in category '{}' on {} tickets",
            TicketCategory::Maintenance.as_str(),
            result.rows_affected
        );
        report.rewrites.push(Rewrite {
            column: "category",
            from: "",
            to: TicketCategory::Maintenance.as_str(),
            rows: result.rows_affected,
        });
    }

    report.unresolved_status = ticket::Entity::find()
        .filter(ticket::Column::Status.is_not_in(TicketStatus::iter().map(|s| s.as_str())))
        .count(&txn)
        .await?;
    report.unresolved_priority = ticket::Entity::find()
        .filter(ticket::Column::Priority.is_not_in(TicketPriority::iter().map(|p| p.as_str())))
        .count(&txn)
        .await?;
    report.unresolved_category = ticket::Entity::find()
        .filter(ticket::Column::Category.is_not_in(TicketCategory::iter().map(|c| c.as_str())))
        .count(&txn)
        .await?;

    txn.commit().await?;

    if !report.is_clean() {
        warn!(
            "Tickets with unknown values: {} status, {} priority, {} category",
            report.unresolved_status, report.unresolved_priority, report.unresolved_category
        );
    }

    Ok(report)
}
