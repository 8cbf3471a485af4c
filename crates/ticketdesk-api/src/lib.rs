pub mod cookie;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Response},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Duration;
use sea_orm::DatabaseConnection;
use std::{any::Any, net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};
use ticketdesk_auth::SessionTokens;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub use cookie::{CookiePolicy, Environment};
pub use error::ApiError;

use middleware::{AuthUser, SessionState};

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub tokens: Arc<SessionTokens>,
    pub cookies: CookiePolicy,
    /// Read-only demo account, if any
    pub demo_user_id: Option<Uuid>,
    /// Pre-built client bundle served for non-API paths
    pub static_dir: Option<PathBuf>,
    pub started_at: Instant,
}

impl AppState {
    /// Reject mutations by the demo account
    pub fn ensure_writable(&self, user: &AuthUser) -> Result<(), ApiError> {
        if self.demo_user_id == Some(user.user_id) {
            return Err(ApiError::bad_request("DEMO_READ_ONLY", "Demo User. Read Only!"));
        }
        Ok(())
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ticket Desk API",
        version = "0.1.0",
        description = "REST API for tracking maintenance and order-fulfillment tickets",
        contact(
            name = "Ticket Desk Team",
            email = "team@ticketdesk.dev"
        )
    ),
    paths(
        handlers::health_check,
        handlers::register,
        handlers::login,
        handlers::logout,
        handlers::list_tickets,
        handlers::create_ticket,
        handlers::ticket_stats,
        handlers::get_ticket,
        handlers::update_ticket,
        handlers::delete_ticket,
        handlers::get_current_user,
        handlers::update_current_user,
        handlers::app_stats,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::MessageResponse,
            models::HealthResponse,
            models::RegisterRequest,
            models::LoginRequest,
            models::UpdateUserRequest,
            models::UserRole,
            models::User,
            models::UserResponse,
            models::AppStatsResponse,
            models::TicketStatus,
            models::TicketPriority,
            models::TicketCategory,
            models::Ticket,
            models::CreateTicketRequest,
            models::UpdateTicketRequest,
            models::TicketResponse,
            models::TicketList,
            models::DefaultStats,
            models::CategoryStats,
            models::MonthlyCount,
            models::StatsResponse,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and logout"),
        (name = "tickets", description = "Ticket management endpoints"),
        (name = "users", description = "Profile and admin endpoints"),
        (name = "system", description = "System health and info endpoints")
    )
)]
pub struct ApiDoc;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Allowed CORS origins (if None, only localhost origins)
    pub cors_origins: Option<Vec<String>>,
    /// Secret for signing session tokens
    pub jwt_secret: String,
    /// Session lifetime
    pub jwt_ttl: Duration,
    /// Selects the session cookie flags
    pub environment: Environment,
    /// Read-only demo account
    pub demo_user_id: Option<Uuid>,
    /// Client bundle to serve for non-API paths
    pub static_dir: Option<PathBuf>,
}

impl ApiServerConfig {
    pub fn new(bind_addr: SocketAddr, jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr,
            cors_origins: None,
            jwt_secret: jwt_secret.into(),
            jwt_ttl: Duration::hours(24),
            environment: Environment::Development,
            demo_user_id: None,
            static_dir: None,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
    session: SessionState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, db: DatabaseConnection) -> Self {
        let tokens = Arc::new(SessionTokens::new(
            config.jwt_secret.as_bytes(),
            config.jwt_ttl,
        ));

        let state = Arc::new(AppState {
            db,
            tokens: tokens.clone(),
            cookies: CookiePolicy::for_environment(config.environment),
            demo_user_id: config.demo_user_id,
            static_dir: config.static_dir.clone(),
            started_at: Instant::now(),
        });

        Self {
            config,
            state,
            session: SessionState::new(tokens),
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        // PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/api/v1/health", get(handlers::health_check))
            .route("/api/v1/auth/register", post(handlers::register))
            .route("/api/v1/auth/login", post(handlers::login))
            .route("/api/v1/auth/logout", get(handlers::logout));

        // PROTECTED routes (require a session)
        let protected_router = Router::new()
            .route(
                "/api/v1/jobs",
                get(handlers::list_tickets).post(handlers::create_ticket),
            )
            .route("/api/v1/jobs/stats", get(handlers::ticket_stats))
            .route(
                "/api/v1/jobs/{id}",
                get(handlers::get_ticket)
                    .patch(handlers::update_ticket)
                    .delete(handlers::delete_ticket),
            )
            .route(
                "/api/v1/users/current-user",
                get(handlers::get_current_user).patch(handlers::update_current_user),
            )
            .route(
                "/api/v1/users/admin/app-stats",
                get(handlers::app_stats)
                    .layer(axum_middleware::from_fn(middleware::require_admin)),
            )
            .route_layer(axum_middleware::from_fn_with_state(
                self.session.clone(),
                middleware::require_auth,
            ));

        let api_router = public_router.merge(protected_router);

        // SwaggerUi creates the route for /api/v1/openapi.json
        let router = api_router
            .fallback(handlers::fallback)
            .with_state(self.state.clone())
            .merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()));

        router
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
            .layer(self.cors_layer())
    }

    fn cors_layer(&self) -> CorsLayer {
        // Cookies need credentials, which rules out a wildcard origin
        let allow_origin = match &self.config.cors_origins {
            Some(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|o| match HeaderValue::from_str(o) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!("Ignoring invalid CORS origin: {}", o);
                            None
                        }
                    })
                    .collect();
                AllowOrigin::list(origins)
            }
            None => AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost:")
                    || origin_str.starts_with("http://127.0.0.1:")
                    || origin_str.starts_with("https://localhost:")
                    || origin_str.starts_with("https://127.0.0.1:")
            }),
        };

        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true)
            .allow_origin(allow_origin)
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/v1/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);
        if let Some(dir) = &self.config.static_dir {
            info!("Serving client bundle from {}", dir.display());
        }

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        info!("API server stopped");
        Ok(())
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);

    ApiError::Internal(detail).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
