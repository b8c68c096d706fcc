//! Batch (received lot) models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single received lot, valued at its own receipt cost
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Denormalized for display after renames
    pub product_name: String,
    pub production_date: Option<NaiveDate>,
    /// Production date plus shelf life; ingredients only
    pub expiry_date: Option<NaiveDate>,
    pub initial_quantity: Decimal,
    pub current_quantity: Decimal,
    /// Fixed at receipt
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn is_live(&self) -> bool {
        self.current_quantity > Decimal::ZERO
    }

    /// Value of the remaining quantity at this batch's own cost
    pub fn current_value(&self) -> Decimal {
        self.current_quantity * self.unit_cost
    }

    /// Expired strictly before `date`
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < date)
    }

    /// Days from `today` until expiry; negative once expired
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date
            .map(|expiry| expiry.signed_duration_since(today).num_days())
    }
}

/// Input for receiving stock into a new batch
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveBatchInput {
    pub product_id: Uuid,
    /// Required for ingredients; defaults to the receipt date otherwise
    pub production_date: Option<NaiveDate>,
    pub initial_quantity: Decimal,
    pub unit_cost: Decimal,
    /// Backfilled receipt time; defaults to now
    pub received_at: Option<DateTime<Utc>>,
}

/// Batch with days remaining before expiry, for warning lists
#[derive(Debug, Clone, Serialize)]
pub struct ExpiringBatch {
    #[serde(flatten)]
    pub batch: Batch,
    pub days_until_expiry: i64,
    pub is_expired: bool,
}
