//! Inventory service for receiving stock and recording movements
//!
//! Every stock change writes the batch row and its ledger entry inside one
//! database transaction. The batch row is locked first so concurrent movements
//! on the same batch are serialized behind the insufficient-stock check.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::ledger::{self, BatchAudit, Receipt};
use shared::stock::{sort_first_expiring, StockScope};
use shared::{Batch, LedgerError, ReceiveBatchInput, RecordMovementInput, Transaction};

use super::now;
use crate::error::{AppError, AppResult};
use crate::models::{
    into_domain, BatchRow, ProductRow, TransactionRow, BATCH_COLUMNS, NEWEST_FIRST,
    PRODUCT_COLUMNS, REPLAY_ORDER, TRANSACTION_COLUMNS,
};

/// Inventory service for batches and the stock ledger
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Receive a new batch and append its IN entry
    pub async fn receive_batch(&self, input: ReceiveBatchInput) -> AppResult<Receipt> {
        let mut tx = self.db.begin().await?;

        // Holds off archiving while the batch is written
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR SHARE");
        let product: shared::Product = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(input.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::ProductNotFound(input.product_id))?
            .try_into()?;

        let receipt = ledger::receive_batch(&product, &input, now())?;
        let batch = &receipt.batch;

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, product_id, product_name, production_date, expiry_date,
                initial_quantity, current_quantity, unit_cost, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(batch.id)
        .bind(batch.product_id)
        .bind(&batch.product_name)
        .bind(batch.production_date)
        .bind(batch.expiry_date)
        .bind(batch.initial_quantity)
        .bind(batch.current_quantity)
        .bind(batch.unit_cost)
        .bind(batch.created_at)
        .execute(&mut *tx)
        .await?;

        insert_transaction(&mut tx, &receipt.transaction)
            .await
            .map_err(|source| inconsistent_write(batch.id, source))?;
        tx.commit()
            .await
            .map_err(|source| inconsistent_write(batch.id, source))?;

        tracing::info!(
            product_id = %batch.product_id,
            batch_id = %batch.id,
            quantity = %batch.initial_quantity,
            unit_cost = %batch.unit_cost,
            "Received batch"
        );
        Ok(receipt)
    }

    /// Apply a signed movement to a batch and append its OUT entry
    pub async fn record_movement(&self, input: RecordMovementInput) -> AppResult<Transaction> {
        let mut tx = self.db.begin().await?;

        let sql = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1 FOR UPDATE");
        let mut batch: Batch = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(input.batch_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::BatchNotFound(input.batch_id))?
            .into();
        // Read under the batch lock so a backdated movement sees every later entry
        let history = fetch_batch_entries(&mut tx, batch.id).await?;

        let transaction = ledger::apply_movement(&mut batch, &history, &input, now()).map_err(|e| {
            tracing::warn!(
                batch_id = %input.batch_id,
                quantity = %input.quantity,
                "Movement rejected: {}",
                e
            );
            e
        })?;

        sqlx::query("UPDATE batches SET current_quantity = $2 WHERE id = $1")
            .bind(batch.id)
            .bind(batch.current_quantity)
            .execute(&mut *tx)
            .await?;

        insert_transaction(&mut tx, &transaction)
            .await
            .map_err(|source| inconsistent_write(batch.id, source))?;
        tx.commit()
            .await
            .map_err(|source| inconsistent_write(batch.id, source))?;

        tracing::info!(
            product_id = %batch.product_id,
            batch_id = %batch.id,
            delta = %input.quantity,
            reason = %input.reason,
            remaining = %batch.current_quantity,
            "Recorded movement"
        );
        Ok(transaction)
    }

    /// Get a batch by ID
    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<Batch> {
        let mut conn = self.db.acquire().await?;
        fetch_batch(&mut conn, batch_id).await
    }

    /// List batches first-expiring first, optionally for one product
    pub async fn list_batches(
        &self,
        product_id: Option<Uuid>,
        scope: StockScope,
    ) -> AppResult<Vec<Batch>> {
        let mut conn = self.db.acquire().await?;
        let mut batches = fetch_batches(&mut conn, product_id, scope).await?;
        sort_first_expiring(&mut batches);
        Ok(batches)
    }

    /// Ledger entries newest first, filtered by product and/or batch
    pub async fn list_transactions(
        &self,
        product_id: Option<Uuid>,
        batch_id: Option<Uuid>,
    ) -> AppResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions \
             WHERE ($1::uuid IS NULL OR product_id = $1) \
               AND ($2::uuid IS NULL OR batch_id = $2) \
             ORDER BY {NEWEST_FIRST}"
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(product_id)
            .bind(batch_id)
            .fetch_all(&self.db)
            .await?;

        into_domain(rows)
    }

    /// Replay a batch's ledger and compare it with the stored quantity
    pub async fn audit_batch(&self, batch_id: Uuid) -> AppResult<BatchAudit> {
        let mut conn = self.db.acquire().await?;
        let batch = fetch_batch(&mut conn, batch_id).await?;
        let transactions = fetch_batch_entries(&mut conn, batch_id).await?;

        let audit = ledger::audit_batch(&batch, &transactions);
        if !audit.is_consistent {
            tracing::error!(
                batch_id = %batch_id,
                stored = %audit.stored_quantity,
                replayed = %audit.replayed_quantity,
                "Batch quantity does not reconcile with its ledger"
            );
        }
        Ok(audit)
    }
}

pub(crate) async fn fetch_batch(conn: &mut PgConnection, batch_id: Uuid) -> AppResult<Batch> {
    let sql = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1");
    let row = sqlx::query_as::<_, BatchRow>(&sql)
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(LedgerError::BatchNotFound(batch_id))?;

    Ok(row.into())
}

pub(crate) async fn fetch_batches(
    conn: &mut PgConnection,
    product_id: Option<Uuid>,
    scope: StockScope,
) -> AppResult<Vec<Batch>> {
    let sql = format!(
        "SELECT {BATCH_COLUMNS} FROM batches \
         WHERE ($1::uuid IS NULL OR product_id = $1) \
           AND ($2 OR current_quantity > 0) \
         ORDER BY created_at"
    );
    let rows = sqlx::query_as::<_, BatchRow>(&sql)
        .bind(product_id)
        .bind(scope == StockScope::All)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(Batch::from).collect())
}

/// A batch's ledger entries in replay order
async fn fetch_batch_entries(conn: &mut PgConnection, batch_id: Uuid) -> AppResult<Vec<Transaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions \
         WHERE batch_id = $1 ORDER BY {REPLAY_ORDER}"
    );
    let rows = sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(batch_id)
        .fetch_all(&mut *conn)
        .await?;

    into_domain(rows)
}

async fn insert_transaction(
    conn: &mut PgConnection,
    transaction: &Transaction,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO inventory_transactions (
            id, product_id, product_name, batch_id, transaction_type, quantity,
            timestamp, reason, notes, unit_cost_at_transaction, is_correction_increase
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.product_id)
    .bind(&transaction.product_name)
    .bind(transaction.batch_id)
    .bind(transaction.transaction_type.as_str())
    .bind(transaction.quantity)
    .bind(transaction.timestamp)
    .bind(transaction.reason.map(|r| r.as_str()))
    .bind(&transaction.notes)
    .bind(transaction.unit_cost_at_transaction)
    .bind(transaction.is_correction_increase)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// The ledger half or the commit failed after the batch half was written
fn inconsistent_write(batch_id: Uuid, source: sqlx::Error) -> AppError {
    tracing::error!(batch_id = %batch_id, "Stock change not confirmed: {}", source);
    AppError::InconsistentLedgerWrite { batch_id, source }
}
