//! Historical reconstruction of stock levels by ledger replay
//!
//! Nothing here reads a stored snapshot. Every point is recomputed by folding
//! the immutable ledger up to the report instant, so the series is only as
//! correct as the ledger itself.

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{group_by_batch, BatchLedger};
use crate::models::{Batch, Transaction};
use crate::types::ExpiredStockPolicy;

/// Chart range and sampling interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TimeScale {
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[default]
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_3_months")]
    Last3Months,
    #[serde(rename = "last_12_months")]
    Last12Months,
}

impl TimeScale {
    /// Report instants, oldest first, ending exactly at `now`
    pub fn report_dates(&self, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut dates: Vec<DateTime<Utc>> = match self {
            TimeScale::Last7Days => step_back(now, Duration::days(1), 7),
            TimeScale::Last30Days => step_back(now, Duration::days(2), 15),
            TimeScale::Last3Months => step_back(now, Duration::weeks(1), 13),
            TimeScale::Last12Months => (0..12)
                .filter_map(|k| now.checked_sub_months(Months::new(k)))
                .collect(),
        };
        dates.reverse();
        dates
    }
}

fn step_back(now: DateTime<Utc>, step: Duration, points: i32) -> Vec<DateTime<Utc>> {
    (0..points).map(|k| now - step * k).collect()
}

/// Stock level and valuation as they stood at one instant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalPoint {
    pub report_date: DateTime<Utc>,
    pub total_value: Decimal,
    pub total_quantity: Decimal,
}

/// Totals across `ledgers` at `at`.
///
/// Batches received after `at` contribute nothing. Under
/// [`ExpiredStockPolicy::Exclude`] an ingredient batch whose expiry date is
/// before the report date contributes nothing either.
pub fn reconstruct_at(
    ledgers: &[BatchLedger<'_>],
    at: DateTime<Utc>,
    policy: ExpiredStockPolicy,
) -> HistoricalPoint {
    let report_day = at.date_naive();
    let (total_quantity, total_value) = ledgers
        .iter()
        .filter(|l| l.batch.created_at <= at)
        .filter(|l| policy == ExpiredStockPolicy::Include || !l.batch.is_expired_on(report_day))
        .map(|l| {
            let qty = l.quantity_at(at);
            (qty, qty * l.batch.unit_cost)
        })
        .fold((Decimal::ZERO, Decimal::ZERO), |(q, v), (qty, value)| {
            (q + qty, v + value)
        });

    HistoricalPoint {
        report_date: at,
        total_value,
        total_quantity,
    }
}

/// One point per report date not after `now`
pub fn series_for_dates(
    batches: &[Batch],
    transactions: &[Transaction],
    report_dates: &[DateTime<Utc>],
    now: DateTime<Utc>,
    policy: ExpiredStockPolicy,
) -> Vec<HistoricalPoint> {
    let ledgers = group_by_batch(batches, transactions);
    report_dates
        .iter()
        .filter(|&&date| date <= now)
        .map(|&date| reconstruct_at(&ledgers, date, policy))
        .collect()
}

/// Trend series for a product's batches and ledger over `scale`
pub fn historical_series(
    batches: &[Batch],
    transactions: &[Transaction],
    scale: TimeScale,
    now: DateTime<Utc>,
    policy: ExpiredStockPolicy,
) -> Vec<HistoricalPoint> {
    series_for_dates(batches, transactions, &scale.report_dates(now), now, policy)
}
