//! WebAssembly module for the Retail Inventory Ledger
//!
//! Lets a browser page compute reports from batches and ledger entries it has
//! already fetched:
//! - Stock details (cost-layered totals)
//! - Historical value and quantity series
//! - Depletion forecasts
//! - Ledger audits
//!
//! Every binding takes and returns JSON in the same shape the HTTP API uses.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

use shared::forecast::{
    average_daily_consumption, forecast_depletion, ConsumptionFilter, DepletionForecast,
    ForecastWindow,
};
use shared::history::{self, HistoricalPoint, TimeScale};
use shared::ledger::{self, BatchAudit};
use shared::stock::{aggregate_stock, StockDetails, StockScope};

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

fn parse<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

/// Enum values arrive as bare strings such as `last_7_days`
fn parse_name<T: DeserializeOwned>(what: &str, name: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| format!("Unknown {} '{}'", what, name))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Failed to serialize result: {}", e))
}

fn parse_id(what: &str, id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id).map_err(|e| format!("Invalid {} id: {}", what, e))
}

fn browser_now() -> Result<DateTime<Utc>, JsValue> {
    DateTime::from_timestamp_millis(js_sys::Date::now() as i64)
        .ok_or_else(|| JsValue::from_str("Browser clock is out of range"))
}

// ============================================================================
// Computations (target independent)
// ============================================================================

pub fn compute_stock_details(
    product_id: &str,
    batches_json: &str,
    include_empty: bool,
) -> Result<StockDetails, String> {
    let product_id = parse_id("product", product_id)?;
    let batches: Vec<Batch> = parse("batches", batches_json)?;
    let scope = if include_empty {
        StockScope::All
    } else {
        StockScope::Live
    };
    Ok(aggregate_stock(product_id, &batches, scope))
}

pub fn compute_historical_series(
    batches_json: &str,
    transactions_json: &str,
    scale: &str,
    expired_stock_policy: &str,
    now: DateTime<Utc>,
) -> Result<Vec<HistoricalPoint>, String> {
    let batches: Vec<Batch> = parse("batches", batches_json)?;
    let transactions: Vec<Transaction> = parse("transactions", transactions_json)?;
    let scale: TimeScale = parse_name("time scale", scale)?;
    let policy: ExpiredStockPolicy = parse_name("expired stock policy", expired_stock_policy)?;

    Ok(history::historical_series(
        &batches,
        &transactions,
        scale,
        now,
        policy,
    ))
}

/// `window_days == 0` selects the previous full calendar week
pub fn compute_depletion_forecast(
    product_id: &str,
    batches_json: &str,
    transactions_json: &str,
    window_days: u32,
    sales_only: bool,
    now: DateTime<Utc>,
) -> Result<DepletionForecast, String> {
    let product_id = parse_id("product", product_id)?;
    let batches: Vec<Batch> = parse("batches", batches_json)?;
    let transactions: Vec<Transaction> = parse("transactions", transactions_json)?;

    let window = match window_days {
        0 => ForecastWindow::PreviousWeek,
        days => ForecastWindow::Trailing { days },
    };
    let filter = if sales_only {
        ConsumptionFilter::SalesOnly
    } else {
        ConsumptionFilter::AllOutflows
    };
    let today = now.date_naive();

    let stock = aggregate_stock(product_id, &batches, StockScope::Live);
    let avg = average_daily_consumption(&transactions, product_id, window, today, filter)
        .map_err(|e| e.to_string())?;
    Ok(forecast_depletion(product_id, stock.total_quantity, avg, today))
}

pub fn compute_batch_audit(
    batch_json: &str,
    transactions_json: &str,
) -> Result<BatchAudit, String> {
    let batch: Batch = parse("batch", batch_json)?;
    let transactions: Vec<Transaction> = parse("transactions", transactions_json)?;
    Ok(ledger::audit_batch(&batch, &transactions))
}

// ============================================================================
// JavaScript bindings
// ============================================================================

/// Total quantity and value of a product's batches, each at its own unit cost
#[wasm_bindgen]
pub fn stock_details(
    product_id: &str,
    batches_json: &str,
    include_empty: bool,
) -> Result<String, JsValue> {
    compute_stock_details(product_id, batches_json, include_empty)
        .and_then(|details| to_json(&details))
        .map_err(|e| JsValue::from_str(&e))
}

/// Stock value and quantity at each report date of `scale`, ending now
#[wasm_bindgen]
pub fn historical_series(
    batches_json: &str,
    transactions_json: &str,
    scale: &str,
    expired_stock_policy: &str,
) -> Result<String, JsValue> {
    let now = browser_now()?;
    compute_historical_series(
        batches_json,
        transactions_json,
        scale,
        expired_stock_policy,
        now,
    )
    .and_then(|series| to_json(&series))
    .map_err(|e| JsValue::from_str(&e))
}

/// Linear depletion forecast from the browser's current date
#[wasm_bindgen]
pub fn depletion_forecast(
    product_id: &str,
    batches_json: &str,
    transactions_json: &str,
    window_days: u32,
    sales_only: bool,
) -> Result<String, JsValue> {
    let now = browser_now()?;
    compute_depletion_forecast(
        product_id,
        batches_json,
        transactions_json,
        window_days,
        sales_only,
        now,
    )
    .and_then(|forecast| to_json(&forecast))
    .map_err(|e| JsValue::from_str(&e))
}

/// Replay a batch's ledger; logs a console warning when it does not reconcile
#[wasm_bindgen]
pub fn audit_batch(batch_json: &str, transactions_json: &str) -> Result<String, JsValue> {
    let audit =
        compute_batch_audit(batch_json, transactions_json).map_err(|e| JsValue::from_str(&e))?;
    if !audit.is_consistent {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "Batch {} stores {} but its ledger replays to {}",
            audit.batch_id, audit.stored_quantity, audit.replayed_quantity
        )));
    }
    to_json(&audit).map_err(|e| JsValue::from_str(&e))
}
