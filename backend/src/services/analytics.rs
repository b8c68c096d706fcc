//! Read-side analytics: stock aggregates, historical trends and depletion forecasts
//!
//! Everything here is computed from persisted batches and ledger entries on
//! each call; nothing is cached between requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::forecast::{
    average_daily_consumption, compare_names, forecast_depletion, rank_by_depletion,
    ConsumptionFilter, DepletionForecast, ForecastWindow, RankedDepletion,
};
use shared::history::{self, HistoricalPoint, TimeScale};
use shared::stock::{self, aggregate_stock, is_low_stock, StockDetails, StockScope};
use shared::{ExpiringBatch, InventorySettings, Product, Transaction};

use super::inventory::fetch_batches;
use super::now;
use super::product::fetch_product;
use crate::error::AppResult;
use crate::models::{
    into_domain, ProductRow, TransactionRow, PRODUCT_COLUMNS, REPLAY_ORDER, TRANSACTION_COLUMNS,
};

/// Analytics service over the batch store and ledger
#[derive(Clone)]
pub struct AnalyticsService {
    db: PgPool,
    settings: InventorySettings,
}

/// Active product at or below its low-stock threshold
#[derive(Debug, Clone, Serialize)]
pub struct LowStockEntry {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: String,
    pub total_quantity: Decimal,
    pub low_stock_threshold: i32,
}

impl AnalyticsService {
    /// Create a new AnalyticsService instance
    pub fn new(db: PgPool, settings: InventorySettings) -> Self {
        Self { db, settings }
    }

    /// Quantity and cost-layered value of a product's batches
    pub async fn stock_details(
        &self,
        product_id: Uuid,
        scope: StockScope,
    ) -> AppResult<StockDetails> {
        let mut conn = self.db.acquire().await?;
        fetch_product(&mut conn, product_id).await?;

        let batches = fetch_batches(&mut conn, Some(product_id), scope).await?;
        Ok(aggregate_stock(product_id, &batches, scope))
    }

    /// Replayed stock value and quantity at each report date of `scale`
    pub async fn historical_series(
        &self,
        product_id: Uuid,
        scale: TimeScale,
    ) -> AppResult<Vec<HistoricalPoint>> {
        let mut conn = self.db.acquire().await?;
        fetch_product(&mut conn, product_id).await?;

        let batches = fetch_batches(&mut conn, Some(product_id), StockScope::All).await?;
        let transactions = fetch_transactions(&mut conn, Some(product_id), None, None).await?;

        let series = history::historical_series(
            &batches,
            &transactions,
            scale,
            now(),
            self.settings.expired_stock_policy,
        );
        tracing::debug!(
            product_id = %product_id,
            points = series.len(),
            batches = batches.len(),
            entries = transactions.len(),
            "Reconstructed historical series"
        );
        Ok(series)
    }

    /// Linear run-rate forecast; `window` defaults to the configured trailing days
    pub async fn depletion_forecast(
        &self,
        product_id: Uuid,
        window: Option<ForecastWindow>,
        filter: ConsumptionFilter,
    ) -> AppResult<DepletionForecast> {
        let window = window.unwrap_or(self.default_window());
        let today = now().date_naive();
        let (start, end) = window.bounds(today)?;

        let mut conn = self.db.acquire().await?;
        fetch_product(&mut conn, product_id).await?;

        let batches = fetch_batches(&mut conn, Some(product_id), StockScope::Live).await?;
        let stock = aggregate_stock(product_id, &batches, StockScope::Live);
        let outflows =
            fetch_transactions(&mut conn, Some(product_id), Some(start), Some(end)).await?;

        let avg = average_daily_consumption(&outflows, product_id, window, today, filter)?;
        Ok(forecast_depletion(product_id, stock.total_quantity, avg, today))
    }

    /// Active products ranked by how soon they run out
    pub async fn depletion_ranking(
        &self,
        window: Option<ForecastWindow>,
        filter: ConsumptionFilter,
    ) -> AppResult<Vec<RankedDepletion>> {
        let window = window.unwrap_or(self.default_window());
        let today = now().date_naive();
        let (start, end) = window.bounds(today)?;

        let mut conn = self.db.acquire().await?;
        let products = fetch_active_products(&mut conn).await?;
        let batches = fetch_batches(&mut conn, None, StockScope::Live).await?;
        let outflows = fetch_transactions(&mut conn, None, Some(start), Some(end)).await?;

        let mut ranked = products
            .into_iter()
            .map(|product| -> AppResult<RankedDepletion> {
                let stock = aggregate_stock(product.id, &batches, StockScope::Live);
                let avg =
                    average_daily_consumption(&outflows, product.id, window, today, filter)?;
                let forecast = forecast_depletion(product.id, stock.total_quantity, avg, today);
                let is_depleting_soon =
                    forecast.is_depleting_within(self.settings.depletion_warning_days);
                Ok(RankedDepletion {
                    product_name: product.name,
                    unit: product.unit,
                    forecast,
                    is_depleting_soon,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        rank_by_depletion(&mut ranked);
        Ok(ranked)
    }

    /// Active products whose live quantity is at or below their threshold
    pub async fn low_stock_report(&self) -> AppResult<Vec<LowStockEntry>> {
        let mut conn = self.db.acquire().await?;
        let products = fetch_active_products(&mut conn).await?;
        let batches = fetch_batches(&mut conn, None, StockScope::Live).await?;

        let mut entries: Vec<LowStockEntry> = products
            .into_iter()
            .filter_map(|product| {
                let stock = aggregate_stock(product.id, &batches, StockScope::Live);
                is_low_stock(&product, &stock).then(|| LowStockEntry {
                    product_id: product.id,
                    product_name: product.name,
                    unit: product.unit,
                    total_quantity: stock.total_quantity,
                    low_stock_threshold: product.low_stock_threshold,
                })
            })
            .collect();
        entries.sort_by(|a, b| compare_names(&a.product_name, &b.product_name));
        Ok(entries)
    }

    /// Live batches expiring within the warning period, soonest first
    pub async fn expiring_batches(&self) -> AppResult<Vec<ExpiringBatch>> {
        let mut conn = self.db.acquire().await?;
        let batches = fetch_batches(&mut conn, None, StockScope::Live).await?;

        Ok(stock::expiring_batches(
            &batches,
            now().date_naive(),
            self.settings.expiry_warning_days,
        ))
    }

    fn default_window(&self) -> ForecastWindow {
        ForecastWindow::Trailing {
            days: self.settings.forecast_window_days,
        }
    }
}

async fn fetch_active_products(conn: &mut PgConnection) -> AppResult<Vec<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE NOT is_archived");
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    into_domain(rows)
}

/// Ledger entries in replay order, optionally limited to `[start, end)`
async fn fetch_transactions(
    conn: &mut PgConnection,
    product_id: Option<Uuid>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AppResult<Vec<Transaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions \
         WHERE ($1::uuid IS NULL OR product_id = $1) \
           AND ($2::timestamptz IS NULL OR timestamp >= $2) \
           AND ($3::timestamptz IS NULL OR timestamp < $3) \
         ORDER BY {REPLAY_ORDER}"
    );
    let rows = sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(product_id)
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;

    into_domain(rows)
}
