//! Route definitions for the factory ledger API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Protected routes
        .nest("/purchases", purchase_routes())
        .nest("/funds", fund_routes())
        .nest("/inventory", inventory_routes())
        .nest("/batches", batch_routes())
        .nest("/materials", material_routes())
        .nest("/products", product_routes())
        .nest("/notifications", notification_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
        // Health check (public); must stay below the auth layer
        .route("/health", get(handlers::health_check))
}

/// Purchase routes (protected)
fn purchase_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_purchases).post(handlers::submit_purchase),
    )
}

/// Fund routes (protected)
fn fund_routes() -> Router<AppState> {
    Router::new()
        .route("/usages", post(handlers::submit_fund_usage))
        .route("/summary", get(handlers::get_my_fund_summary))
        .route("/summary/:user_id", get(handlers::get_fund_summary))
        .route("/:fund_id", get(handlers::get_fund))
        .route("/:fund_id/usages", get(handlers::list_fund_usages))
        .route("/:fund_id/return", post(handlers::return_fund))
}

/// Inventory routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(handlers::get_inventory_summary))
        .route(
            "/transfers",
            get(handlers::list_transfers).post(handlers::submit_transfer),
        )
        .route("/transfers/:transfer_id/confirm", post(handlers::confirm_transfer))
        .route("/transfers/:transfer_id/cancel", post(handlers::cancel_transfer))
}

/// Manufacturing batch routes (protected)
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::submit_batch))
        .route("/pipeline", get(handlers::get_batch_pipeline))
        .route("/:batch_id", get(handlers::get_batch))
        .route("/:batch_id/status", post(handlers::advance_batch_status))
}

/// Raw material routes (protected)
fn material_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_materials).post(handlers::create_material),
        )
        .route("/low-stock", get(handlers::list_low_stock_materials))
}

/// Product routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_products).post(handlers::create_product),
    )
}

/// Notification routes (protected)
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/:notification_id/read", post(handlers::mark_notification_read))
}
