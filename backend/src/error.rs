//! Error handling for the inventory server
//!
//! Maps domain and storage failures onto consistent JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::LedgerError;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Domain errors (validation, referential, state conflict)
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // Request shape errors
    #[error("Validation error: {0}")]
    ValidationError(String),

    // Partial write: the batch and its ledger entry were not both persisted
    #[error("Ledger write for batch {batch_id} did not complete")]
    InconsistentLedgerWrite {
        batch_id: Uuid,
        #[source]
        source: sqlx::Error,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Quantity the caller can retry with after a stock conflict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Decimal>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            available: None,
        }
    }
}

fn ledger_status(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::ProductNotFound(_) | LedgerError::BatchNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::DuplicateName(_) => StatusCode::CONFLICT,
        LedgerError::InsufficientStock { .. }
        | LedgerError::ExceedsInitialQuantity { .. }
        | LedgerError::ProductArchived(_)
        | LedgerError::BatchProductMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::LedgerInconsistent { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        LedgerError::InvalidShelfLife(_)
        | LedgerError::MissingProductionDate
        | LedgerError::InvalidQuantity
        | LedgerError::InvalidUnitCost
        | LedgerError::InvalidThreshold
        | LedgerError::ZeroQuantityMovement
        | LedgerError::InvalidTimestamp(_)
        | LedgerError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Ledger(error) => {
                let available = match error {
                    LedgerError::InsufficientStock { available, .. } => Some(*available),
                    _ => None,
                };
                (
                    ledger_status(error),
                    ErrorDetail {
                        code: error.code().to_string(),
                        message: error.to_string(),
                        field: error.field().map(str::to_string),
                        available,
                    },
                )
            }
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::InconsistentLedgerWrite { batch_id, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INCONSISTENT_LEDGER_WRITE",
                    format!(
                        "Stock change for batch {} could not be confirmed. \
                         Audit the batch before retrying.",
                        batch_id
                    ),
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
        };

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
