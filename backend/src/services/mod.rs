//! Business logic services for the inventory server

pub mod analytics;
pub mod inventory;
pub mod product;

pub use analytics::AnalyticsService;
pub use inventory::InventoryService;
pub use product::ProductService;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision Postgres stores
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Unique index violations surface as SQLSTATE 23505
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().as_deref() == Some("23505"),
        _ => false,
    }
}
