//! Batch-and-ledger accounting core for the retail inventory tracker
//!
//! This crate holds the domain models and every pure rule of the ledger:
//! receiving lots, applying stock movements, aggregating stock by cost layer,
//! replaying the ledger to reconstruct past stock levels, and forecasting
//! depletion. It performs no I/O; the backend persists what it computes and
//! the wasm crate runs the read-side analytics in the browser.

pub mod error;
pub mod forecast;
pub mod history;
pub mod ledger;
pub mod models;
pub mod stock;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
