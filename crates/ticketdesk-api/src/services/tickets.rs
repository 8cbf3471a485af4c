//! Ticket store operations
//!
//! Every operation is scoped to one owner. Single-ticket operations go through
//! [`authorize`] first, which resolves the id and checks that the caller owns
//! the ticket or is an admin.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use ticketdesk_db::{
    entities::ticket::{
        self, TicketCategory, TicketPriority, TicketStatus, UnknownValue, DEFAULT_LOCATION,
    },
    legacy,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{canonical, required};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{
    CategoryStats, CreateTicketRequest, DefaultStats, MonthlyCount, TicketListQuery,
    UpdateTicketRequest,
};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 1000;

/// Months reported by [`stats`]
pub const STATS_MONTHS: usize = 6;

/// Filter value meaning "no filter"
const ALL: &str = "all";

/// Ordering of the ticket list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    Newest,
    Oldest,
    /// Subject ascending
    AToZ,
    /// Subject descending
    ZToA,
}

impl SortOrder {
    /// Unknown keys sort newest first
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("oldest") => SortOrder::Oldest,
            Some("a-z") => SortOrder::AToZ,
            Some("z-a") => SortOrder::ZToA,
            _ => SortOrder::Newest,
        }
    }

    fn apply(self, query: Select<ticket::Entity>) -> Select<ticket::Entity> {
        match self {
            SortOrder::Newest => query.order_by_desc(ticket::Column::CreatedAt),
            SortOrder::Oldest => query.order_by_asc(ticket::Column::CreatedAt),
            SortOrder::AToZ => query.order_by_asc(ticket::Column::Subject),
            SortOrder::ZToA => query.order_by_desc(ticket::Column::Subject),
        }
    }
}

/// Validated list parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFilters {
    pub search: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub sort: SortOrder,
    pub page: u64,
    pub limit: u64,
}

impl Default for TicketFilters {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            priority: None,
            category: None,
            sort: SortOrder::Newest,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl TicketFilters {
    pub fn from_query(query: TicketListQuery) -> Result<Self, ApiError> {
        Ok(Self {
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            status: enum_filter(query.status.as_deref())?,
            priority: enum_filter(query.priority.as_deref())?,
            category: enum_filter(query.category.as_deref())?,
            sort: SortOrder::parse(query.sort.as_deref()),
            page: positive_or(query.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(query.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
        })
    }
}

fn enum_filter<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = UnknownValue>,
{
    match raw.map(str::trim) {
        None | Some("") | Some(ALL) => Ok(None),
        Some(value) => canonical(value).map(Some),
    }
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|r| r.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Escape LIKE wildcards so the search text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_ci(column: ticket::Column, pattern: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col((ticket::Entity, column))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

/// One page of the owner's tickets
#[derive(Debug, Clone)]
pub struct TicketPage {
    pub tickets: Vec<ticket::Model>,
    pub total: u64,
    pub num_of_pages: u64,
    pub current_page: u64,
}

pub async fn list(
    db: &DatabaseConnection,
    owner_id: Uuid,
    filters: &TicketFilters,
) -> Result<TicketPage, ApiError> {
    debug!("Listing tickets of {} with {:?}", owner_id, filters);

    let mut condition = Condition::all().add(ticket::Column::OwnerId.eq(owner_id));

    if let Some(search) = &filters.search {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        condition = condition.add(
            Condition::any()
                .add(contains_ci(ticket::Column::Subject, &pattern))
                .add(contains_ci(ticket::Column::Entity, &pattern)),
        );
    }
    if let Some(status) = filters.status {
        condition = condition.add(ticket::Column::Status.eq(status));
    }
    if let Some(priority) = filters.priority {
        condition = condition.add(ticket::Column::Priority.eq(priority));
    }
    if let Some(category) = filters.category {
        condition = condition.add(ticket::Column::Category.eq(category));
    }

    let query = filters.sort.apply(ticket::Entity::find().filter(condition));

    let paginator = query.paginate(db, filters.limit);
    let total = paginator.num_items().await?;
    let tickets = paginator.fetch_page(filters.page - 1).await?;

    Ok(TicketPage {
        tickets,
        total,
        num_of_pages: total.div_ceil(filters.limit),
        current_page: filters.page,
    })
}

pub async fn create(
    db: &DatabaseConnection,
    owner_id: Uuid,
    request: CreateTicketRequest,
) -> Result<ticket::Model, ApiError> {
    let subject = required("subject", &request.subject)?;
    let entity = required("entity", &request.entity)?;
    let location = match request.location.as_deref().map(str::trim) {
        Some(l) if !l.is_empty() => l.to_string(),
        _ => DEFAULT_LOCATION.to_string(),
    };
    let status: TicketStatus = request
        .status
        .as_deref()
        .map(canonical)
        .transpose()?
        .unwrap_or_default();
    let priority: TicketPriority = request
        .priority
        .as_deref()
        .map(canonical)
        .transpose()?
        .unwrap_or_default();
    let category: TicketCategory = request
        .category
        .as_deref()
        .map(canonical)
        .transpose()?
        .unwrap_or_default();
    let now = Utc::now();

    let created = ticket::ActiveModel {
        id: Set(Uuid::new_v4()),
        subject: Set(subject),
        entity: Set(entity),
        location: Set(location),
        status: Set(status),
        priority: Set(priority),
        category: Set(category),
        owner_id: Set(owner_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!("User {} created ticket {}", owner_id, created.id);

    Ok(created)
}

/// Load a ticket the caller may act on
///
/// # Errors
/// - `INVALID_ID` (400) when `raw_id` is not a UUID
/// - `TICKET_NOT_FOUND` (404) when no ticket has that id
/// - `FORBIDDEN` (403) when the caller is neither the owner nor an admin
pub async fn authorize(
    db: &DatabaseConnection,
    user: &AuthUser,
    raw_id: &str,
) -> Result<ticket::Model, ApiError> {
    let id = Uuid::parse_str(raw_id.trim())
        .map_err(|_| ApiError::bad_request("INVALID_ID", format!("invalid id: {}", raw_id)))?;

    let ticket = ticket::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| {
            ApiError::not_found("TICKET_NOT_FOUND", format!("no ticket with id {}", id))
        })?;

    if ticket.owner_id != user.user_id && !user.is_admin() {
        warn!("User {} denied access to ticket {}", user.user_id, id);
        return Err(ApiError::unauthorized(
            "FORBIDDEN",
            "not authorized to access this ticket",
        ));
    }

    Ok(ticket)
}

/// Apply the provided fields; absent fields keep their value
pub async fn update(
    db: &DatabaseConnection,
    ticket: ticket::Model,
    request: UpdateTicketRequest,
) -> Result<ticket::Model, ApiError> {
    let id = ticket.id;
    let mut active: ticket::ActiveModel = ticket.into();

    if let Some(subject) = request.subject {
        active.subject = Set(required("subject", &subject)?);
    }
    if let Some(entity) = request.entity {
        active.entity = Set(required("entity", &entity)?);
    }
    if let Some(location) = request.location {
        active.location = Set(required("location", &location)?);
    }
    if let Some(status) = request.status {
        active.status = Set(canonical(&status)?);
    }
    if let Some(priority) = request.priority {
        active.priority = Set(canonical(&priority)?);
    }
    if let Some(category) = request.category {
        active.category = Set(canonical(&category)?);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    info!("Updated ticket {}", id);

    Ok(updated)
}

/// Delete a ticket and return the removed record
pub async fn delete(
    db: &DatabaseConnection,
    ticket: ticket::Model,
) -> Result<ticket::Model, ApiError> {
    let removed = ticket.clone();
    ticket.delete(db).await?;
    info!("Deleted ticket {}", removed.id);

    Ok(removed)
}

/// Aggregates over one owner's tickets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketStats {
    pub by_status: DefaultStats,
    pub by_category: CategoryStats,
    pub monthly: Vec<MonthlyCount>,
}

pub async fn stats(db: &DatabaseConnection, owner_id: Uuid) -> Result<TicketStats, ApiError> {
    let by_status = count_by(db, owner_id, ticket::Column::Status).await?;
    let by_category = count_by(db, owner_id, ticket::Column::Category).await?;
    let by_month = count_by_month(db, owner_id).await?;

    Ok(TicketStats {
        by_status: fold_status(by_status),
        by_category: fold_category(by_category),
        monthly: monthly_counts(by_month),
    })
}

/// Creation month of a ticket as `YYYY-MM`
fn creation_month(backend: DbBackend) -> SimpleExpr {
    match backend {
        DbBackend::Postgres => Expr::cust("to_char(\"created_at\" AT TIME ZONE 'UTC', 'YYYY-MM')"),
        // SQLite stores timestamps as ISO-8601 text
        _ => Expr::cust("substr(\"created_at\", 1, 7)"),
    }
}

/// Row counts per creation month (`YYYY-MM`)
async fn count_by_month(
    db: &DatabaseConnection,
    owner_id: Uuid,
) -> Result<Vec<(String, i64)>, ApiError> {
    let month = creation_month(db.get_database_backend());

    let rows = ticket::Entity::find()
        .select_only()
        .column_as(month.clone(), "month")
        .column_as(Expr::col(ticket::Column::Id).count(), "count")
        .filter(ticket::Column::OwnerId.eq(owner_id))
        .group_by(month)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows)
}

/// Row counts per raw stored value of `column`
///
/// Grouping on the stored string keeps rows with legacy spellings countable.
async fn count_by(
    db: &DatabaseConnection,
    owner_id: Uuid,
    column: ticket::Column,
) -> Result<Vec<(String, i64)>, ApiError> {
    let rows = ticket::Entity::find()
        .select_only()
        .column(column)
        .column_as(Expr::col(ticket::Column::Id).count(), "count")
        .filter(ticket::Column::OwnerId.eq(owner_id))
        .group_by(column)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows)
}

fn fold_status(rows: Vec<(String, i64)>) -> DefaultStats {
    let mut stats = DefaultStats::default();
    for (raw, count) in rows {
        let count = count.max(0) as u64;
        match legacy::resolve_status(&raw) {
            Ok(TicketStatus::Open) => stats.open += count,
            Ok(TicketStatus::InProgress) => stats.in_progress += count,
            Ok(TicketStatus::Cancelled) => stats.cancelled += count,
            Err(e) => warn!("Skipping {} tickets in stats: {}", count, e),
        }
    }
    stats
}

fn fold_category(rows: Vec<(String, i64)>) -> CategoryStats {
    let mut stats = CategoryStats::default();
    for (raw, count) in rows {
        let count = count.max(0) as u64;
        match legacy::resolve_category(&raw) {
            Ok(TicketCategory::Maintenance) => stats.maintenance += count,
            Ok(TicketCategory::OrderFulfillment) => stats.order_fulfillment += count,
            Err(e) => warn!("Skipping {} tickets in stats: {}", count, e),
        }
    }
    stats
}

/// Tickets per creation month for the most recent months that have any,
/// oldest first, labelled like "Jan 25"
fn monthly_counts(rows: Vec<(String, i64)>) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for (key, count) in rows {
        match parse_month(&key) {
            Some(month) => *months.entry(month).or_default() += count.max(0) as u64,
            None => warn!("Skipping {} tickets in stats: bad creation month '{}'", count, key),
        }
    }

    let skip = months.len().saturating_sub(STATS_MONTHS);
    months
        .into_iter()
        .skip(skip)
        .filter_map(|((year, month), count)| {
            NaiveDate::from_ymd_opt(year, month, 1).map(|first| MonthlyCount {
                date: first.format("%b %y").to_string(),
                count,
            })
        })
        .collect()
}

fn parse_month(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    let month: u32 = month.parse().ok().filter(|m| (1..=12).contains(m))?;
    Some((year.parse().ok()?, month))
}
