//! Factory Ledger - Backend Server

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use factory_ledger::{
    create_app,
    store::{MemoryStore, PgStore, SharedStore},
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "fl_server=debug,factory_ledger=debug,tower_http=debug,sqlx=warn".into()
    });
    let json_logs = std::env::var("FLEDGER_LOG_JSON").map(|v| v == "1").unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let config = Config::load()?;

    tracing::info!("Starting Factory Ledger Server");
    tracing::info!("Environment: {}", config.environment);

    let store: SharedStore = if config.database.is_memory() {
        tracing::warn!("Using the in-memory store; nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Connecting to database...");
        let pg = PgStore::connect(&config.database).await?;
        tracing::info!("Database connection established");

        // Run migrations in development
        if config.environment == "development" {
            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(pg.pool()).await?;
            tracing::info!("Migrations completed");
        }

        Arc::new(pg)
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Build application
    let app = create_app(AppState::new(store, config));

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
