//! Ledger transaction models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable stock-movement entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub batch_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    /// Always non-negative; direction comes from `transaction_type` and `is_correction_increase`
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<MovementReason>,
    pub notes: Option<String>,
    pub unit_cost_at_transaction: Decimal,
    pub is_correction_increase: bool,
}

impl Transaction {
    /// Quantity with its effect on stock applied: positive adds, negative removes
    pub fn signed_quantity(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::In => self.quantity,
            TransactionType::Out if self.is_correction_increase => self.quantity,
            TransactionType::Out => -self.quantity,
        }
    }

    /// True for outflows that represent real consumption
    pub fn is_consumption(&self) -> bool {
        self.transaction_type == TransactionType::Out && !self.is_correction_increase
    }
}

/// Ledger entry type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    In,
    Out,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN" => Some(TransactionType::In),
            "OUT" => Some(TransactionType::Out),
            _ => None,
        }
    }
}

/// Why stock left (or, for corrections, came back)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementReason {
    Sale,
    Spoilage,
    InternalUse,
    AdjustmentDecrease,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Sale => "SALE",
            MovementReason::Spoilage => "SPOILAGE",
            MovementReason::InternalUse => "INTERNAL_USE",
            MovementReason::AdjustmentDecrease => "ADJUSTMENT_DECREASE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SALE" => Some(MovementReason::Sale),
            "SPOILAGE" => Some(MovementReason::Spoilage),
            "INTERNAL_USE" => Some(MovementReason::InternalUse),
            "ADJUSTMENT_DECREASE" => Some(MovementReason::AdjustmentDecrease),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementReason::Sale => write!(f, "Sale"),
            MovementReason::Spoilage => write!(f, "Spoilage"),
            MovementReason::InternalUse => write!(f, "Internal Use"),
            MovementReason::AdjustmentDecrease => write!(f, "Adjustment"),
        }
    }
}

/// Input for recording a stock movement against a batch
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMovementInput {
    pub product_id: Uuid,
    pub batch_id: Uuid,
    /// Negative consumes stock, positive restores it as a correction
    pub quantity: Decimal,
    pub reason: MovementReason,
    pub notes: Option<String>,
    /// Backfilled movement time; defaults to now
    pub timestamp: Option<DateTime<Utc>>,
}
