//! Row types for sqlx queries and their conversion into domain models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use shared::models::{Batch, MovementReason, Product, ProductCategory, Transaction, TransactionType};

use crate::error::AppError;

pub const PRODUCT_COLUMNS: &str = "id, name, category, unit, shelf_life_days, low_stock_threshold, \
     image_url, created_at, is_archived";

pub const BATCH_COLUMNS: &str = "id, product_id, product_name, production_date, expiry_date, \
     initial_quantity, current_quantity, unit_cost, created_at";

pub const TRANSACTION_COLUMNS: &str = "id, product_id, product_name, batch_id, transaction_type, \
     quantity, timestamp, reason, notes, unit_cost_at_transaction, is_correction_increase";

/// Chronological, receipts first within an instant, then recording order
pub const REPLAY_ORDER: &str = "timestamp, (transaction_type <> 'IN'), seq";

/// Exact reverse of [`REPLAY_ORDER`]
pub const NEWEST_FIRST: &str = "timestamp DESC, (transaction_type <> 'IN') DESC, seq DESC";

#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub shelf_life_days: Option<i32>,
    pub low_stock_threshold: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_archived: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = ProductCategory::parse(&row.category).ok_or_else(|| {
            AppError::Internal(format!("Unknown product category '{}'", row.category))
        })?;

        Ok(Product {
            id: row.id,
            name: row.name,
            category,
            unit: row.unit,
            shelf_life_days: row.shelf_life_days,
            low_stock_threshold: row.low_stock_threshold,
            image_url: row.image_url,
            created_at: row.created_at,
            is_archived: row.is_archived,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct BatchRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub initial_quantity: Decimal,
    pub current_quantity: Decimal,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            production_date: row.production_date,
            expiry_date: row.expiry_date,
            initial_quantity: row.initial_quantity,
            current_quantity: row.current_quantity,
            unit_cost: row.unit_cost,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub batch_id: Option<Uuid>,
    pub transaction_type: String,
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub unit_cost_at_transaction: Decimal,
    pub is_correction_increase: bool,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = TransactionType::parse(&row.transaction_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown transaction type '{}'", row.transaction_type))
        })?;
        let reason = row
            .reason
            .as_deref()
            .map(|r| {
                MovementReason::parse(r)
                    .ok_or_else(|| AppError::Internal(format!("Unknown movement reason '{}'", r)))
            })
            .transpose()?;

        Ok(Transaction {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            batch_id: row.batch_id,
            transaction_type,
            quantity: row.quantity,
            timestamp: row.timestamp,
            reason,
            notes: row.notes,
            unit_cost_at_transaction: row.unit_cost_at_transaction,
            is_correction_increase: row.is_correction_increase,
        })
    }
}

/// Convert fetched rows, failing on the first row with an unknown enum value
pub fn into_domain<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
