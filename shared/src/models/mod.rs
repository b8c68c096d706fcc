//! Domain models for the retail inventory ledger

mod batch;
mod product;
mod transaction;

pub use batch::*;
pub use product::*;
pub use transaction::*;
