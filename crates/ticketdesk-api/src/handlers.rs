use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::debug;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::services::{auth as auth_service, tickets as ticket_service, users as user_service};
use crate::AppState;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(request) = payload?;
    let user = auth_service::register(&state.db, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            msg: "user created".to_string(),
            user: user.into(),
        }),
    ))
}

/// Log in and receive the session cookie
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session set in the `token` cookie", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let (user, issued) = auth_service::login(&state.db, &state.tokens, request).await?;
    let cookie = state
        .cookies
        .session_cookie(&issued.token, issued.expires_at)?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse {
            msg: "user logged in".to_string(),
            user: user.into(),
        }),
    ))
}

/// Log out by expiring the session cookie
#[utoipa::path(
    get,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let cookie = state.cookies.logout_cookie()?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            msg: "user logged out!".to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// List the caller's tickets
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive match on subject or entity"),
        ("jobStatus" = Option<String>, Query, description = "Status filter or \"all\" (alias: status)"),
        ("jobType" = Option<String>, Query, description = "Priority filter or \"all\" (alias: priority)"),
        ("ticketCategory" = Option<String>, Query, description = "Category filter or \"all\" (alias: category)"),
        ("sort" = Option<String>, Query, description = "newest (default), oldest, a-z or z-a"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Page size (default: 10, max: 1000)")
    ),
    responses(
        (status = 200, description = "One page of tickets", body = TicketList),
        (status = 400, description = "Unknown filter value", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<TicketListQuery>, QueryRejection>,
) -> Result<Json<TicketList>, ApiError> {
    let Query(query) = query?;
    let filters = ticket_service::TicketFilters::from_query(query)?;
    let page = ticket_service::list(&state.db, user.user_id, &filters).await?;

    Ok(Json(TicketList {
        msg: "tickets fetched".to_string(),
        total_tickets: page.total,
        num_of_pages: page.num_of_pages,
        current_page: page.current_page,
        tickets: page.tickets.into_iter().map(Ticket::from).collect(),
    }))
}

/// Create a ticket owned by the caller
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    request_body = CreateTicketRequest,
    responses(
        (status = 201, description = "Ticket created", body = TicketResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    state.ensure_writable(&user)?;
    let Json(request) = payload?;
    let ticket = ticket_service::create(&state.db, user.user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(TicketResponse {
            msg: "ticket created".to_string(),
            ticket: ticket.into(),
        }),
    ))
}

/// Aggregate statistics over the caller's tickets
#[utoipa::path(
    get,
    path = "/api/v1/jobs/stats",
    responses(
        (status = 200, description = "Ticket statistics", body = StatsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn ticket_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = ticket_service::stats(&state.db, user.user_id).await?;

    Ok(Json(StatsResponse {
        msg: "ticket stats".to_string(),
        default_stats: stats.by_status,
        category_stats: stats.by_category,
        monthly_tickets: stats.monthly,
    }))
}

/// Get a ticket by ID
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket", body = TicketResponse),
        (status = 400, description = "Malformed ID", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Ticket not found", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    debug!("Getting ticket: {}", id);
    let ticket = ticket_service::authorize(&state.db, &user, &id).await?;

    Ok(Json(TicketResponse {
        msg: "ticket found".to_string(),
        ticket: ticket.into(),
    }))
}

/// Update a ticket (partial)
#[utoipa::path(
    patch,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    request_body = UpdateTicketRequest,
    responses(
        (status = 200, description = "Ticket modified", body = TicketResponse),
        (status = 400, description = "Malformed ID or invalid input", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Ticket not found", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTicketRequest>, JsonRejection>,
) -> Result<Json<TicketResponse>, ApiError> {
    state.ensure_writable(&user)?;
    let ticket = ticket_service::authorize(&state.db, &user, &id).await?;
    let Json(request) = payload?;
    let updated = ticket_service::update(&state.db, ticket, request).await?;

    Ok(Json(TicketResponse {
        msg: "ticket modified".to_string(),
        ticket: updated.into(),
    }))
}

/// Delete a ticket
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket deleted; body holds the removed ticket", body = TicketResponse),
        (status = 400, description = "Malformed ID", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Ticket not found", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    state.ensure_writable(&user)?;
    let ticket = ticket_service::authorize(&state.db, &user, &id).await?;
    let removed = ticket_service::delete(&state.db, ticket).await?;

    Ok(Json(TicketResponse {
        msg: "ticket deleted".to_string(),
        ticket: removed.into(),
    }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Get the logged-in user
#[utoipa::path(
    get,
    path = "/api/v1/users/current-user",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let current = user_service::current_user(&state.db, user.user_id).await?;

    Ok(Json(UserResponse {
        msg: "current user".to_string(),
        user: current.into(),
    }))
}

/// Update the logged-in user's profile
#[utoipa::path(
    patch,
    path = "/api/v1/users/current-user",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid input or email taken", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    state.ensure_writable(&user)?;
    let Json(request) = payload?;
    let updated = user_service::update_current_user(&state.db, user.user_id, request).await?;

    Ok(Json(UserResponse {
        msg: "update user".to_string(),
        user: updated.into(),
    }))
}

/// Application-wide user and ticket counts
#[utoipa::path(
    get,
    path = "/api/v1/users/admin/app-stats",
    responses(
        (status = 200, description = "Application statistics", body = AppStatsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn app_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AppStatsResponse>, ApiError> {
    let (users, tickets) = user_service::app_stats(&state.db).await?;

    Ok(Json(AppStatsResponse {
        msg: "application stats".to_string(),
        users,
        tickets,
    }))
}

/// Unknown API routes get a JSON 404; everything else goes to the client
/// bundle when one is configured
pub async fn fallback(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let is_api = request.uri().path().starts_with("/api");

    match &state.static_dir {
        Some(dir) if !is_api => {
            let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            match spa.oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            }
        }
        _ => ApiError::not_found("NOT_FOUND", "not found").into_response(),
    }
}
