//! HTTP request handlers

mod analytics;
mod health;
mod inventory;
mod products;

pub use analytics::*;
pub use health::*;
pub use inventory::*;
pub use products::*;
