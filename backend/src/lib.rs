//! Factory Ledger
//!
//! Transactional core of a factory-operations console: a fund ledger that
//! pays for raw material purchases, a manufacturing batch state machine whose
//! completion produces finished goods, and a per-location inventory ledger
//! that moves those goods between manufacturing, transit and wholesale.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use services::LedgerService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: LedgerService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: store::SharedStore, config: Config) -> Self {
        Self {
            ledger: LedgerService::new(store, config.ledger.clone()),
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Factory Ledger API v1.0"
}
