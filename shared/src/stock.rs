//! Stock aggregation by cost layer

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Batch, ExpiringBatch, Product};

/// Which batches an aggregate covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockScope {
    /// Batches with stock remaining
    #[default]
    Live,
    /// Every batch ever received, for audit views
    All,
}

/// Current totals for one product
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StockDetails {
    pub product_id: Uuid,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
    /// First-expiring first
    pub live_batches: Vec<Batch>,
}

/// Sum quantity and value over the product's batches, each at its own unit cost
pub fn aggregate_stock(product_id: Uuid, batches: &[Batch], scope: StockScope) -> StockDetails {
    let mut selected: Vec<Batch> = batches
        .iter()
        .filter(|b| b.product_id == product_id)
        .filter(|b| scope == StockScope::All || b.is_live())
        .cloned()
        .collect();
    sort_first_expiring(&mut selected);

    let (total_quantity, total_value) = selected
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(qty, value), b| {
            (qty + b.current_quantity, value + b.current_value())
        });

    StockDetails {
        product_id,
        total_quantity,
        total_value,
        live_batches: selected,
    }
}

/// Expiring batches first, undated batches last, oldest receipt breaking ties
pub fn sort_first_expiring(batches: &mut [Batch]) {
    batches.sort_by(|a, b| match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.created_at.cmp(&b.created_at)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.created_at.cmp(&b.created_at),
    });
}

/// Low stock when the live quantity is at or below the product threshold
pub fn is_low_stock(product: &Product, stock: &StockDetails) -> bool {
    stock.total_quantity <= Decimal::from(product.low_stock_threshold)
}

/// Live batches that expire within `warning_days` of `today`, including already expired ones
pub fn expiring_batches(
    batches: &[Batch],
    today: NaiveDate,
    warning_days: i64,
) -> Vec<ExpiringBatch> {
    let mut expiring: Vec<ExpiringBatch> = batches
        .iter()
        .filter(|b| b.is_live())
        .filter_map(|b| {
            let days = b.days_until_expiry(today)?;
            (days <= warning_days).then(|| ExpiringBatch {
                batch: b.clone(),
                days_until_expiry: days,
                is_expired: b.is_expired_on(today),
            })
        })
        .collect();
    expiring.sort_by_key(|e| e.days_until_expiry);
    expiring
}
