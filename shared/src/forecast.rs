//! Linear depletion forecasting from trailing consumption

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{MovementReason, Transaction};

/// Reporting window for average consumption, always ending before today
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastWindow {
    /// The last full Monday-to-Sunday week before the current one
    PreviousWeek,
    /// The `days` whole days before today
    Trailing { days: u32 },
}

/// Longest trailing window accepted, in days
pub const MAX_WINDOW_DAYS: u32 = 3660;

impl ForecastWindow {
    pub fn days(&self) -> LedgerResult<u32> {
        match self {
            ForecastWindow::PreviousWeek => Ok(7),
            ForecastWindow::Trailing { days: 0 } => Err(LedgerError::InvalidWindow(
                "trailing window must cover at least one day".to_string(),
            )),
            ForecastWindow::Trailing { days } if *days > MAX_WINDOW_DAYS => {
                Err(LedgerError::InvalidWindow(format!(
                    "trailing window cannot exceed {} days",
                    MAX_WINDOW_DAYS
                )))
            }
            ForecastWindow::Trailing { days } => Ok(*days),
        }
    }

    /// Half-open `[start, end)` bounds at UTC midnight
    pub fn bounds(&self, today: NaiveDate) -> LedgerResult<(DateTime<Utc>, DateTime<Utc>)> {
        let days = self.days()?;
        let end_day = match self {
            ForecastWindow::PreviousWeek => days_before(
                today,
                today.weekday().num_days_from_monday(),
            )?,
            ForecastWindow::Trailing { .. } => today,
        };
        let start_day = days_before(end_day, days)?;
        Ok((midnight(start_day), midnight(end_day)))
    }
}

fn days_before(day: NaiveDate, days: u32) -> LedgerResult<NaiveDate> {
    day.checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| LedgerError::InvalidWindow(format!("window starts before {}", NaiveDate::MIN)))
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Which outflows count as consumption
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionFilter {
    #[default]
    AllOutflows,
    SalesOnly,
}

impl ConsumptionFilter {
    fn accepts(&self, transaction: &Transaction) -> bool {
        match self {
            ConsumptionFilter::AllOutflows => true,
            ConsumptionFilter::SalesOnly => transaction.reason == Some(MovementReason::Sale),
        }
    }
}

/// Sum of consumed quantity for `product_id` within `[start, end)`.
/// Correction increases are not consumption and never count.
pub fn consumption_between(
    transactions: &[Transaction],
    product_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter: ConsumptionFilter,
) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.product_id == product_id)
        .filter(|t| t.is_consumption())
        .filter(|t| t.timestamp >= start && t.timestamp < end)
        .filter(|t| filter.accepts(t))
        .map(|t| t.quantity)
        .sum()
}

pub fn average_daily_consumption(
    transactions: &[Transaction],
    product_id: Uuid,
    window: ForecastWindow,
    today: NaiveDate,
    filter: ConsumptionFilter,
) -> LedgerResult<Decimal> {
    let (start, end) = window.bounds(today)?;
    let total = consumption_between(transactions, product_id, start, end, filter);
    total
        .checked_div(Decimal::from(window.days()?))
        .ok_or_else(|| LedgerError::InvalidWindow("consumption total is out of range".to_string()))
}

/// Where a product's stock is heading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepletionOutlook {
    AlreadyDepleted,
    /// No consumption observed; depletion is unbounded
    CannotPredict,
    Projected { predicted_depletion_date: NaiveDate },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepletionForecast {
    pub product_id: Uuid,
    pub current_stock: Decimal,
    pub avg_daily_consumption: Decimal,
    #[serde(flatten)]
    pub outlook: DepletionOutlook,
    /// `None` stands for an unbounded horizon
    pub days_to_depletion: Option<i64>,
}

impl DepletionForecast {
    pub fn is_depleting_within(&self, days: i64) -> bool {
        self.days_to_depletion.is_some_and(|d| d <= days)
    }

    /// Ranking order: soonest first, unpredictable last
    pub fn cmp_urgency(&self, other: &Self) -> Ordering {
        match (self.days_to_depletion, other.days_to_depletion) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Project days until `current_stock` runs out at `avg_daily_consumption` per day
pub fn forecast_depletion(
    product_id: Uuid,
    current_stock: Decimal,
    avg_daily_consumption: Decimal,
    today: NaiveDate,
) -> DepletionForecast {
    let (outlook, days_to_depletion) = if current_stock <= Decimal::ZERO {
        (DepletionOutlook::AlreadyDepleted, Some(0))
    } else if avg_daily_consumption <= Decimal::ZERO {
        (DepletionOutlook::CannotPredict, None)
    } else {
        // A horizon too far out to represent is as good as unbounded
        let projection = current_stock
            .checked_div(avg_daily_consumption)
            .and_then(|ratio| {
                ratio
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .to_i64()
            })
            .and_then(|days| {
                let date = today.checked_add_days(Days::new(u64::try_from(days).ok()?))?;
                Some((days, date))
            });
        match projection {
            Some((days, predicted_depletion_date)) => (
                DepletionOutlook::Projected { predicted_depletion_date },
                Some(days),
            ),
            None => (DepletionOutlook::CannotPredict, None),
        }
    };

    DepletionForecast {
        product_id,
        current_stock,
        avg_daily_consumption,
        outlook,
        days_to_depletion,
    }
}

/// Forecast row for the "depleting soonest" view
#[derive(Debug, Clone, Serialize)]
pub struct RankedDepletion {
    pub product_name: String,
    pub unit: String,
    #[serde(flatten)]
    pub forecast: DepletionForecast,
    pub is_depleting_soon: bool,
}

/// Soonest depletion first, unpredictable products last, then by name
pub fn rank_by_depletion(rows: &mut [RankedDepletion]) {
    rows.sort_by(|a, b| {
        a.forecast
            .cmp_urgency(&b.forecast)
            .then_with(|| compare_names(&a.product_name, &b.product_name))
    });
}

/// Case-insensitive first, exact spelling as tiebreaker
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn out(product_id: Uuid, qty: &str, at: DateTime<Utc>, reason: MovementReason, correction: bool) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            product_id,
            product_name: "Oat Milk".to_string(),
            batch_id: Some(Uuid::new_v4()),
            transaction_type: TransactionType::Out,
            quantity: dec(qty),
            timestamp: at,
            reason: Some(reason),
            notes: None,
            unit_cost_at_transaction: dec("1"),
            is_correction_increase: correction,
        }
    }

    #[test]
    fn test_previous_week_bounds() {
        // Wednesday
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let (start, end) = ForecastWindow::PreviousWeek.bounds(today).unwrap();
        assert_eq!(start, midnight(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()));
        assert_eq!(end, midnight(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()));

        // On a Monday the previous week ends at today's midnight
        let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let (_, end) = ForecastWindow::PreviousWeek.bounds(monday).unwrap();
        assert_eq!(end, midnight(monday));
    }

    #[test]
    fn test_trailing_window_excludes_today() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let (start, end) = ForecastWindow::Trailing { days: 30 }.bounds(today).unwrap();
        assert_eq!(end, midnight(today));
        assert_eq!(end - start, Duration::days(30));
        assert!(ForecastWindow::Trailing { days: 0 }.bounds(today).is_err());
    }

    #[test]
    fn test_oversized_trailing_window_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        for days in [MAX_WINDOW_DAYS + 1, u32::MAX] {
            let err = ForecastWindow::Trailing { days }.bounds(today).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidWindow(_)));
        }
        assert!(ForecastWindow::Trailing { days: MAX_WINDOW_DAYS }.bounds(today).is_ok());

        // Near the calendar's lower edge the window cannot start
        let earliest = NaiveDate::MIN + Days::new(3);
        assert!(matches!(
            ForecastWindow::Trailing { days: 30 }.bounds(earliest),
            Err(LedgerError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_tiny_run_rate_does_not_overflow() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let forecast = forecast_depletion(Uuid::new_v4(), Decimal::MAX, dec("0.0000000001"), today);
        assert_eq!(forecast.outlook, DepletionOutlook::CannotPredict);
        assert_eq!(forecast.days_to_depletion, None);
    }

    #[test]
    fn test_average_excludes_corrections_and_out_of_window() {
        let product_id = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let day = |n: i64| midnight(today) - Duration::days(n) + Duration::hours(10);
        let ledger = vec![
            out(product_id, "6", day(1), MovementReason::Sale, false),
            out(product_id, "8", day(5), MovementReason::Spoilage, false),
            out(product_id, "2", day(2), MovementReason::AdjustmentDecrease, true),
            out(product_id, "50", day(9), MovementReason::Sale, false),
            out(product_id, "40", midnight(today) + Duration::hours(1), MovementReason::Sale, false),
            out(Uuid::new_v4(), "70", day(1), MovementReason::Sale, false),
        ];
        let window = ForecastWindow::Trailing { days: 7 };

        let all = average_daily_consumption(&ledger, product_id, window, today, ConsumptionFilter::AllOutflows)
            .unwrap();
        assert_eq!(all, dec("2"));

        let sales = average_daily_consumption(&ledger, product_id, window, today, ConsumptionFilter::SalesOnly)
            .unwrap();
        assert_eq!(sales, dec("6") / dec("7"));
    }

    #[test]
    fn test_forecast_projection_rounds_half_up() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let forecast = forecast_depletion(Uuid::new_v4(), dec("9"), dec("2.0"), today);
        assert_eq!(forecast.days_to_depletion, Some(5));
        assert_eq!(
            forecast.outlook,
            DepletionOutlook::Projected {
                predicted_depletion_date: NaiveDate::from_ymd_opt(2024, 6, 17).unwrap()
            }
        );
    }

    #[test]
    fn test_forecast_sentinels() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();

        let depleted = forecast_depletion(Uuid::new_v4(), Decimal::ZERO, dec("3"), today);
        assert_eq!(depleted.outlook, DepletionOutlook::AlreadyDepleted);
        assert_eq!(depleted.days_to_depletion, Some(0));

        let idle = forecast_depletion(Uuid::new_v4(), dec("12"), Decimal::ZERO, today);
        assert_eq!(idle.outlook, DepletionOutlook::CannotPredict);
        assert_eq!(idle.days_to_depletion, None);
        assert!(!idle.is_depleting_within(i64::MAX));
    }

    #[test]
    fn test_forecast_serializes_status_tag() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let idle = forecast_depletion(Uuid::new_v4(), dec("12"), Decimal::ZERO, today);
        let json = serde_json::to_value(&idle).unwrap();
        assert_eq!(json["status"], "CANNOT_PREDICT");
        assert!(json["days_to_depletion"].is_null());
    }

    #[test]
    fn test_ranking_puts_unpredictable_last() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let row = |name: &str, stock: &str, avg: &str| {
            let forecast = forecast_depletion(Uuid::new_v4(), dec(stock), dec(avg), today);
            RankedDepletion {
                product_name: name.to_string(),
                unit: "pcs".to_string(),
                is_depleting_soon: forecast.is_depleting_within(7),
                forecast,
            }
        };
        let mut rows = vec![
            row("Zucchini", "10", "0"),
            row("basil", "10", "1"),
            row("Apples", "10", "0"),
            row("Butter", "0", "1"),
            row("Almonds", "10", "1"),
            row("Cocoa", "4", "1"),
        ];

        rank_by_depletion(&mut rows);
        let names: Vec<&str> = rows.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, vec!["Butter", "Cocoa", "Almonds", "basil", "Apples", "Zucchini"]);
        assert!(rows[0].is_depleting_soon);
        assert!(rows[1].is_depleting_soon);
        assert!(!rows[2].is_depleting_soon);
    }
}
