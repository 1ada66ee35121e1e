//! Horizon - interaction and graph consistency engine for a small social network
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - JSON endpoints under /api                                │
//! │  - Bearer-token extractors                                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Validation, ownership, notification fan-out              │
//! │  - Auth providers (local / hosted)                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx), one write transaction per mutation        │
//! │  - Interaction ledgers with stored counters                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `auth`: Passwords, tokens and identity providers
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Identity backend selected at startup
    pub auth: Arc<dyn auth::AuthProvider>,

    pub posts: Arc<service::PostService>,
    pub follows: Arc<service::FollowService>,
    pub notifications: Arc<service::NotificationService>,
    pub accounts: Arc<service::AccountService>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Build the configured auth provider
    /// 3. Wire services
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database).await?);
        tracing::info!("Database connected");

        // 2. Auth provider
        let store: Arc<dyn auth::CredentialStore> = db.clone();
        let auth = auth::build_auth_provider(&config.auth, store)?;

        // 3. Services
        let notifications = Arc::new(service::NotificationService::new(db.clone()));
        let posts = Arc::new(service::PostService::new(db.clone(), notifications.clone()));
        let follows = Arc::new(service::FollowService::new(db.clone(), notifications.clone()));
        let accounts = Arc::new(service::AccountService::new(db.clone()));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            auth,
            posts,
            follows,
            notifications,
            accounts,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{
        compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
        trace::TraceLayer,
    };

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .layer(axum::middleware::from_fn(api::metrics::track_requests))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
