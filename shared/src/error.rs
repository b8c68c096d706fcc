//! Domain errors raised by the ledger core
//!
//! Every variant is detected before any write is attempted, so a caller that
//! receives one of these knows the record store is untouched.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by product, batch and ledger rules
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    // Referential errors
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Batch {0} not found")]
    BatchNotFound(Uuid),

    #[error("Batch {batch_id} does not belong to product {product_id}")]
    BatchProductMismatch { batch_id: Uuid, product_id: Uuid },

    // Validation errors
    #[error("An active product named '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid shelf life: {0}")]
    InvalidShelfLife(String),

    #[error("Production date is required for ingredient products")]
    MissingProductionDate,

    #[error("Quantity must be greater than zero, at most 1000000000 and have at most 4 decimal places")]
    InvalidQuantity,

    #[error("Unit cost must be between 0 and 1000000000 with at most 4 decimal places")]
    InvalidUnitCost,

    #[error("Low-stock threshold cannot be negative")]
    InvalidThreshold,

    #[error("Movement quantity cannot be zero")]
    ZeroQuantityMovement,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid forecast window: {0}")]
    InvalidWindow(String),

    // State-conflict errors
    #[error("Product {0} is archived")]
    ProductArchived(Uuid),

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: Decimal, requested: Decimal },

    #[error("Correction would raise the batch to {resulting}, above its initial quantity {initial}")]
    ExceedsInitialQuantity { initial: Decimal, resulting: Decimal },

    // Audit
    #[error("Ledger replay gives {expected} but the batch stores {actual}")]
    LedgerInconsistent { expected: Decimal, actual: Decimal },
}

impl LedgerError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            LedgerError::BatchNotFound(_) => "BATCH_NOT_FOUND",
            LedgerError::BatchProductMismatch { .. } => "BATCH_PRODUCT_MISMATCH",
            LedgerError::DuplicateName(_) => "DUPLICATE_NAME",
            LedgerError::InvalidShelfLife(_) => "INVALID_SHELF_LIFE",
            LedgerError::MissingProductionDate => "MISSING_PRODUCTION_DATE",
            LedgerError::InvalidQuantity => "INVALID_QUANTITY",
            LedgerError::InvalidUnitCost => "INVALID_UNIT_COST",
            LedgerError::InvalidThreshold => "INVALID_THRESHOLD",
            LedgerError::ZeroQuantityMovement => "ZERO_QUANTITY_MOVEMENT",
            LedgerError::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            LedgerError::InvalidWindow(_) => "INVALID_WINDOW",
            LedgerError::ProductArchived(_) => "PRODUCT_ARCHIVED",
            LedgerError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            LedgerError::ExceedsInitialQuantity { .. } => "EXCEEDS_INITIAL_QUANTITY",
            LedgerError::LedgerInconsistent { .. } => "LEDGER_INCONSISTENT",
        }
    }

    /// Field the caller should correct, if the error is tied to one input
    pub fn field(&self) -> Option<&'static str> {
        match self {
            LedgerError::DuplicateName(_) => Some("name"),
            LedgerError::InvalidShelfLife(_) => Some("shelf_life_days"),
            LedgerError::MissingProductionDate => Some("production_date"),
            LedgerError::InvalidQuantity
            | LedgerError::ZeroQuantityMovement
            | LedgerError::InsufficientStock { .. }
            | LedgerError::ExceedsInitialQuantity { .. } => Some("quantity"),
            LedgerError::InvalidUnitCost => Some("unit_cost"),
            LedgerError::InvalidThreshold => Some("low_stock_threshold"),
            LedgerError::InvalidTimestamp(_) => Some("timestamp"),
            LedgerError::InvalidWindow(_) => Some("window"),
            _ => None,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
