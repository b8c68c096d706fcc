//! Route definitions for the inventory server

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Product catalog and per-product reports
        .nest("/products", product_routes())
        // Batches and ledger
        .nest("/batches", batch_routes())
        .route("/movements", post(handlers::record_movement))
        .route("/transactions", get(handlers::list_transactions))
        // Cross-product reports
        .nest("/inventory", inventory_routes())
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::get_product).put(handlers::update_product),
        )
        .route("/:product_id/archive", post(handlers::archive_product))
        .route("/:product_id/unarchive", post(handlers::unarchive_product))
        .route("/:product_id/stock", get(handlers::get_stock_details))
        .route("/:product_id/history", get(handlers::get_historical_series))
        .route("/:product_id/forecast", get(handlers::get_depletion_forecast))
        .route(
            "/:product_id/transactions",
            get(handlers::list_product_transactions),
        )
}

fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::receive_batch))
        .route("/:batch_id", get(handlers::get_batch))
        .route("/:batch_id/audit", get(handlers::audit_batch))
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/expiring", get(handlers::get_expiring_batches))
        .route("/low-stock", get(handlers::get_low_stock))
        .route("/depletion", get(handlers::get_depletion_ranking))
}
