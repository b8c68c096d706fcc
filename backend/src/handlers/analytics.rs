//! HTTP handlers for stock reports, trends and forecasts

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::forecast::{ConsumptionFilter, DepletionForecast, ForecastWindow, RankedDepletion};
use shared::history::{HistoricalPoint, TimeScale};
use shared::stock::{StockDetails, StockScope};
use shared::ExpiringBatch;

use crate::{
    error::{AppError, AppResult},
    services::{analytics::LowStockEntry, AnalyticsService},
    AppState,
};

fn analytics(state: AppState) -> AnalyticsService {
    AnalyticsService::new(state.db, state.config.inventory.settings())
}

/// Query parameters for stock details
#[derive(Debug, Deserialize)]
pub struct StockQuery {
    #[serde(default)]
    pub scope: StockScope,
}

/// Query parameters for historical series
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub scale: TimeScale,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    PreviousWeek,
    Trailing,
}

/// Query parameters for depletion forecasts
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub window: Option<WindowKind>,
    /// Trailing window length; the configured default applies when absent
    pub days: Option<u32>,
    #[serde(default)]
    pub sales_only: bool,
}

impl ForecastQuery {
    fn window(&self) -> AppResult<Option<ForecastWindow>> {
        match (self.window, self.days) {
            (Some(WindowKind::PreviousWeek), None) => Ok(Some(ForecastWindow::PreviousWeek)),
            (Some(WindowKind::PreviousWeek), Some(_)) => Err(AppError::ValidationError(
                "days only applies to the trailing window".to_string(),
            )),
            (_, Some(days)) => Ok(Some(ForecastWindow::Trailing { days })),
            (_, None) => Ok(None),
        }
    }

    fn filter(&self) -> ConsumptionFilter {
        if self.sales_only {
            ConsumptionFilter::SalesOnly
        } else {
            ConsumptionFilter::AllOutflows
        }
    }
}

/// Current stock for a product
pub async fn get_stock_details(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<StockDetails>> {
    let details = analytics(state).stock_details(product_id, query.scope).await?;
    Ok(Json(details))
}

/// Stock value and quantity over time
pub async fn get_historical_series(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoricalPoint>>> {
    let series = analytics(state)
        .historical_series(product_id, query.scale)
        .await?;
    Ok(Json(series))
}

/// Projected depletion for a product
pub async fn get_depletion_forecast(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<ForecastQuery>,
) -> AppResult<Json<DepletionForecast>> {
    let forecast = analytics(state)
        .depletion_forecast(product_id, query.window()?, query.filter())
        .await?;
    Ok(Json(forecast))
}

/// Active products ranked soonest-depleting first
pub async fn get_depletion_ranking(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> AppResult<Json<Vec<RankedDepletion>>> {
    let ranking = analytics(state)
        .depletion_ranking(query.window()?, query.filter())
        .await?;
    Ok(Json(ranking))
}

pub async fn get_low_stock(State(state): State<AppState>) -> AppResult<Json<Vec<LowStockEntry>>> {
    let entries = analytics(state).low_stock_report().await?;
    Ok(Json(entries))
}

pub async fn get_expiring_batches(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ExpiringBatch>>> {
    let batches = analytics(state).expiring_batches().await?;
    Ok(Json(batches))
}
