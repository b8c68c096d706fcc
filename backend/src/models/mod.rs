//! Database models for the inventory server
//!
//! Re-exports models from the shared crate and adds the row types that map
//! Postgres records onto them

mod rows;

pub use rows::*;
pub use shared::models::*;
