//! Historical reconstruction tests
//!
//! Tests for replaying the ledger into value and quantity series including:
//! - Report date sampling per time scale
//! - As-of-now point reconciles with live stock
//! - Expired stock policy
//! - Read idempotence

use chrono::{DateTime, Duration, Months, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::history::{historical_series, series_for_dates, TimeScale};
use shared::ledger::{apply_movement, receive_batch};
use shared::stock::{aggregate_stock, StockScope};
use shared::{
    Batch, ExpiredStockPolicy, MovementReason, Product, ProductCategory, ReceiveBatchInput,
    RecordMovementInput, Transaction, TransactionType,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
}

fn product(shelf_life_days: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Cream cheese".to_string(),
        category: ProductCategory::Ingredient,
        unit: "kg".to_string(),
        shelf_life_days: Some(shelf_life_days),
        low_stock_threshold: 2,
        image_url: None,
        created_at: now() - Duration::days(365),
        is_archived: false,
    }
}

/// Record a receipt that happened at `at`, produced on `produced`
fn receive_at(
    product: &Product,
    qty: &str,
    cost: &str,
    at: DateTime<Utc>,
    produced: NaiveDate,
    ledger: &mut Vec<Transaction>,
) -> Batch {
    let input = ReceiveBatchInput {
        product_id: product.id,
        production_date: Some(produced),
        initial_quantity: dec(qty),
        unit_cost: dec(cost),
        received_at: Some(at),
    };
    let receipt = receive_batch(product, &input, now()).unwrap();
    ledger.push(receipt.transaction);
    receipt.batch
}

fn move_at(
    batch: &mut Batch,
    quantity: &str,
    reason: MovementReason,
    at: DateTime<Utc>,
    ledger: &mut Vec<Transaction>,
) {
    let input = RecordMovementInput {
        product_id: batch.product_id,
        batch_id: batch.id,
        quantity: dec(quantity),
        reason,
        notes: None,
        timestamp: Some(at),
    };
    let entry = apply_movement(batch, ledger.as_slice(), &input, now()).unwrap();
    ledger.push(entry);
}

/// Two layers with sales spread over the last three weeks
fn sample_history() -> (Product, Vec<Batch>, Vec<Transaction>) {
    let product = product(60);
    let mut ledger = Vec::new();
    let received = now() - Duration::days(20);
    let mut b1 = receive_at(&product, "10", "2.00", received, received.date_naive(), &mut ledger);
    let received = now() - Duration::days(5);
    let mut b2 = receive_at(&product, "6", "3.00", received, received.date_naive(), &mut ledger);

    move_at(&mut b1, "-4", MovementReason::Sale, now() - Duration::days(10), &mut ledger);
    move_at(&mut b1, "-6", MovementReason::Spoilage, now() - Duration::days(3), &mut ledger);
    move_at(&mut b2, "-1", MovementReason::Sale, now() - Duration::days(1), &mut ledger);
    move_at(
        &mut b2,
        "1",
        MovementReason::AdjustmentDecrease,
        now() - Duration::hours(12),
        &mut ledger,
    );

    (product, vec![b1, b2], ledger)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_report_dates_per_scale() {
        let cases = [
            (TimeScale::Last7Days, 7, Duration::days(1)),
            (TimeScale::Last30Days, 15, Duration::days(2)),
            (TimeScale::Last3Months, 13, Duration::weeks(1)),
        ];
        for (scale, points, step) in cases {
            let dates = scale.report_dates(now());
            assert_eq!(dates.len(), points, "{:?}", scale);
            assert_eq!(*dates.last().unwrap(), now());
            for pair in dates.windows(2) {
                assert_eq!(pair[1] - pair[0], step);
            }
        }

        let monthly = TimeScale::Last12Months.report_dates(now());
        assert_eq!(monthly.len(), 12);
        assert_eq!(monthly[0], now().checked_sub_months(Months::new(11)).unwrap());
        assert_eq!(*monthly.last().unwrap(), now());
    }

    #[test]
    fn test_time_scale_names() {
        let scale: TimeScale = serde_json::from_str("\"last_3_months\"").unwrap();
        assert_eq!(scale, TimeScale::Last3Months);
        assert_eq!(TimeScale::default(), TimeScale::Last30Days);
    }

    #[test]
    fn test_latest_point_reconciles_with_live_stock() {
        let (product, batches, ledger) = sample_history();

        let series = historical_series(
            &batches,
            &ledger,
            TimeScale::Last30Days,
            now(),
            ExpiredStockPolicy::Exclude,
        );
        let stock = aggregate_stock(product.id, &batches, StockScope::Live);

        let latest = series.last().unwrap();
        assert_eq!(latest.report_date, now());
        assert_eq!(latest.total_quantity, stock.total_quantity);
        assert_eq!(latest.total_value, stock.total_value);
        assert_eq!(stock.total_quantity, dec("6"));
        assert_eq!(stock.total_value, dec("18.00"));
    }

    #[test]
    fn test_past_points_replay_each_layer_at_its_cost() {
        let (_, batches, ledger) = sample_history();
        let series = historical_series(
            &batches,
            &ledger,
            TimeScale::Last30Days,
            now(),
            ExpiredStockPolicy::Exclude,
        );
        assert_eq!(series.len(), 15);

        // Before the first receipt
        assert_eq!(series[0].report_date, now() - Duration::days(28));
        assert_eq!(series[0].total_quantity, Decimal::ZERO);
        assert_eq!(series[0].total_value, Decimal::ZERO);

        // Four days ago: 6 left in the first layer, 6 in the second
        let point = &series[12];
        assert_eq!(point.report_date, now() - Duration::days(4));
        assert_eq!(point.total_quantity, dec("12"));
        assert_eq!(point.total_value, dec("30.00"));
    }

    #[test]
    fn test_reads_are_idempotent() {
        let (_, batches, ledger) = sample_history();
        let first = historical_series(
            &batches,
            &ledger,
            TimeScale::Last7Days,
            now(),
            ExpiredStockPolicy::Exclude,
        );
        let second = historical_series(
            &batches,
            &ledger,
            TimeScale::Last7Days,
            now(),
            ExpiredStockPolicy::Exclude,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_expired_batches_follow_policy() {
        let product = product(3);
        let mut ledger = Vec::new();
        let received = now() - Duration::days(10);
        // Expires on 2024-06-03
        let batch = receive_at(&product, "10", "1.50", received, received.date_naive(), &mut ledger);
        let batches = vec![batch];

        let excluded = historical_series(
            &batches,
            &ledger,
            TimeScale::Last7Days,
            now(),
            ExpiredStockPolicy::Exclude,
        );
        assert!(excluded.iter().all(|p| p.total_quantity.is_zero()));

        let included = historical_series(
            &batches,
            &ledger,
            TimeScale::Last7Days,
            now(),
            ExpiredStockPolicy::Include,
        );
        let stock = aggregate_stock(product.id, &batches, StockScope::Live);
        let latest = included.last().unwrap();
        assert_eq!(latest.total_quantity, stock.total_quantity);
        assert_eq!(latest.total_value, dec("15.00"));
    }

    #[test]
    fn test_future_report_dates_are_dropped() {
        let (_, batches, ledger) = sample_history();
        let dates = [now() - Duration::days(1), now() + Duration::days(1)];

        let series =
            series_for_dates(&batches, &ledger, &dates, now(), ExpiredStockPolicy::Exclude);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].report_date, dates[0]);
    }

    #[test]
    fn test_replay_never_goes_negative() {
        let product = product(60);
        let batch = Batch {
            id: Uuid::new_v4(),
            product_id: product.id,
            product_name: product.name.clone(),
            production_date: Some(now().date_naive()),
            expiry_date: None,
            initial_quantity: dec("5"),
            current_quantity: Decimal::ZERO,
            unit_cost: dec("1.00"),
            created_at: now() - Duration::days(2),
        };
        // A legacy batch without a receipt entry and an outflow larger than it
        let ledger = vec![Transaction {
            id: Uuid::new_v4(),
            product_id: product.id,
            product_name: product.name.clone(),
            batch_id: Some(batch.id),
            transaction_type: TransactionType::Out,
            quantity: dec("8"),
            timestamp: now() - Duration::days(1),
            reason: Some(MovementReason::Sale),
            notes: None,
            unit_cost_at_transaction: dec("1.00"),
            is_correction_increase: false,
        }];

        let series = series_for_dates(
            &[batch],
            &ledger,
            &[now() - Duration::hours(36), now()],
            now(),
            ExpiredStockPolicy::Exclude,
        );
        assert_eq!(series[0].total_quantity, dec("5"));
        assert_eq!(series[1].total_quantity, Decimal::ZERO);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn delta_strategy() -> impl Strategy<Value = i64> {
        prop_oneof![(-40i64..=-1i64), (1i64..=40i64)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Replaying the full ledger lands on the stored stock
        #[test]
        fn prop_replay_reconciles_with_live_stock(
            layers in prop::collection::vec((10i64..=200i64, 1i64..=500i64), 1..4),
            moves in prop::collection::vec((0usize..4, delta_strategy()), 0..25),
            scale in prop_oneof![
                Just(TimeScale::Last7Days),
                Just(TimeScale::Last30Days),
                Just(TimeScale::Last3Months),
                Just(TimeScale::Last12Months),
            ]
        ) {
            let product = product(400);
            let mut ledger = Vec::new();
            let start = now() - Duration::days(30);

            let mut batches: Vec<Batch> = layers
                .iter()
                .enumerate()
                .map(|(i, (qty, cost))| {
                    let at = start + Duration::hours(i as i64);
                    let input = ReceiveBatchInput {
                        product_id: product.id,
                        production_date: Some(at.date_naive()),
                        initial_quantity: Decimal::from(*qty),
                        unit_cost: Decimal::new(*cost, 2),
                        received_at: Some(at),
                    };
                    let receipt = receive_batch(&product, &input, now()).unwrap();
                    ledger.push(receipt.transaction);
                    receipt.batch
                })
                .collect();

            for (step, (which, delta)) in moves.into_iter().enumerate() {
                let index = which % batches.len();
                let batch = &mut batches[index];
                let input = RecordMovementInput {
                    product_id: batch.product_id,
                    batch_id: batch.id,
                    quantity: Decimal::from(delta),
                    reason: MovementReason::Sale,
                    notes: None,
                    timestamp: Some(start + Duration::days(1) + Duration::hours(step as i64)),
                };
                if let Ok(entry) = apply_movement(batch, &ledger, &input, now()) {
                    ledger.push(entry);
                }
            }

            let series = historical_series(&batches, &ledger, scale, now(), ExpiredStockPolicy::Exclude);
            let stock = aggregate_stock(product.id, &batches, StockScope::Live);
            let latest = series.last().unwrap();

            prop_assert_eq!(latest.total_quantity, stock.total_quantity);
            prop_assert_eq!(latest.total_value, stock.total_value);
            prop_assert!(series.iter().all(|p| p.total_quantity >= Decimal::ZERO));
        }
    }
}
