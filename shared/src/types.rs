//! Common types used across the ledger core

use serde::{Deserialize, Serialize};

/// Display thresholds injected from configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventorySettings {
    /// Batches expiring within this many days are flagged
    pub expiry_warning_days: i64,
    /// Products projected to run out within this many days are flagged
    pub depletion_warning_days: i64,
    /// Trailing window used when a forecast request names none
    pub forecast_window_days: u32,
    pub expired_stock_policy: ExpiredStockPolicy,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            expiry_warning_days: 7,
            depletion_warning_days: 7,
            forecast_window_days: 7,
            expired_stock_policy: ExpiredStockPolicy::Exclude,
        }
    }
}

/// Whether expired ingredient stock counts toward historical totals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredStockPolicy {
    /// Expired batches contribute neither quantity nor value
    #[default]
    Exclude,
    /// Expired batches count until written off
    Include,
}
