//! HTTP handlers for batches, stock movements and the ledger

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::ledger::BatchAudit;
use shared::stock::StockScope;

use crate::{
    error::AppResult,
    models::{Batch, ReceiveBatchInput, RecordMovementInput, Transaction},
    services::InventoryService,
    AppState,
};

/// Query parameters for listing batches
#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub scope: StockScope,
}

/// Query parameters for listing ledger entries
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub product_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
}

/// Receive a batch of stock
pub async fn receive_batch(
    State(state): State<AppState>,
    Json(input): Json<ReceiveBatchInput>,
) -> AppResult<impl IntoResponse> {
    let service = InventoryService::new(state.db);
    let receipt = service.receive_batch(input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Record a sale, spoilage, internal use or correction against a batch
pub async fn record_movement(
    State(state): State<AppState>,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<impl IntoResponse> {
    let service = InventoryService::new(state.db);
    let transaction = service.record_movement(input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// List batches, first-expiring first
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<ListBatchesQuery>,
) -> AppResult<Json<Vec<Batch>>> {
    let service = InventoryService::new(state.db);
    let batches = service.list_batches(query.product_id, query.scope).await?;
    Ok(Json(batches))
}

/// Get a batch by ID
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let service = InventoryService::new(state.db);
    let batch = service.get_batch(batch_id).await?;
    Ok(Json(batch))
}

/// Replay a batch's ledger against its stored quantity
pub async fn audit_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<BatchAudit>> {
    let service = InventoryService::new(state.db);
    let audit = service.audit_batch(batch_id).await?;
    Ok(Json(audit))
}

/// List ledger entries, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> AppResult<Json<Vec<Transaction>>> {
    let service = InventoryService::new(state.db);
    let transactions = service
        .list_transactions(query.product_id, query.batch_id)
        .await?;
    Ok(Json(transactions))
}

/// Ledger entries for one product
pub async fn list_product_transactions(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<Transaction>>> {
    let service = InventoryService::new(state.db);
    let transactions = service.list_transactions(Some(product_id), None).await?;
    Ok(Json(transactions))
}
