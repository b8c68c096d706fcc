//! Validation rules applied at the ledger boundary
//!
//! Each check runs before any write so rejected input leaves the store untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Product, ProductCategory};

// ============================================================================
// Product Validations
// ============================================================================

/// Ingredients need a positive shelf life; other products must not carry one
pub fn validate_shelf_life(
    category: ProductCategory,
    shelf_life_days: Option<i32>,
) -> LedgerResult<()> {
    match (category, shelf_life_days) {
        (ProductCategory::Ingredient, Some(days)) if days > 0 => Ok(()),
        (ProductCategory::Ingredient, Some(_)) => Err(LedgerError::InvalidShelfLife(
            "shelf life must be a positive number of days".to_string(),
        )),
        (ProductCategory::Ingredient, None) => Err(LedgerError::InvalidShelfLife(
            "shelf life is required for ingredient products".to_string(),
        )),
        (ProductCategory::NonIngredient, None) => Ok(()),
        (ProductCategory::NonIngredient, Some(_)) => Err(LedgerError::InvalidShelfLife(
            "only ingredient products have a shelf life".to_string(),
        )),
    }
}

pub fn validate_threshold(threshold: i32) -> LedgerResult<()> {
    if threshold < 0 {
        return Err(LedgerError::InvalidThreshold);
    }
    Ok(())
}

/// Names compare trimmed and case-insensitively
pub fn names_conflict(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Reject `name` if an active product other than `exclude_id` already uses it
pub fn ensure_unique_name<'a>(
    name: &str,
    exclude_id: Option<Uuid>,
    products: impl IntoIterator<Item = &'a Product>,
) -> LedgerResult<()> {
    let taken = products.into_iter().any(|p| {
        !p.is_archived && Some(p.id) != exclude_id && names_conflict(&p.name, name)
    });
    if taken {
        return Err(LedgerError::DuplicateName(name.trim().to_string()));
    }
    Ok(())
}

// ============================================================================
// Batch and Movement Validations
// ============================================================================

/// Largest quantity a single receipt or movement may carry
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Largest unit cost a receipt may carry
pub const MAX_UNIT_COST: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Decimal places kept for quantities and costs; matches the NUMERIC columns
pub const MAX_SCALE: u32 = 4;

pub fn validate_receipt_quantity(quantity: Decimal) -> LedgerResult<()> {
    if quantity <= Decimal::ZERO || quantity > MAX_QUANTITY || quantity.scale() > MAX_SCALE {
        return Err(LedgerError::InvalidQuantity);
    }
    Ok(())
}

/// Movements are signed; only their magnitude is bounded
pub fn validate_movement_quantity(quantity: Decimal) -> LedgerResult<()> {
    if quantity.is_zero() {
        return Err(LedgerError::ZeroQuantityMovement);
    }
    validate_receipt_quantity(quantity.abs())
}

pub fn validate_unit_cost(unit_cost: Decimal) -> LedgerResult<()> {
    if unit_cost < Decimal::ZERO || unit_cost > MAX_UNIT_COST || unit_cost.scale() > MAX_SCALE {
        return Err(LedgerError::InvalidUnitCost);
    }
    Ok(())
}

/// A caller-supplied timestamp may not be in the future or before `not_before`
pub fn validate_timestamp(
    timestamp: DateTime<Utc>,
    not_before: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    if timestamp > now {
        return Err(LedgerError::InvalidTimestamp(format!(
            "{} is in the future",
            timestamp.to_rfc3339()
        )));
    }
    if let Some(earliest) = not_before {
        if timestamp < earliest {
            return Err(LedgerError::InvalidTimestamp(format!(
                "{} is before the batch was received at {}",
                timestamp.to_rfc3339(),
                earliest.to_rfc3339()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn product(name: &str, archived: bool) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: ProductCategory::NonIngredient,
            unit: "pcs".to_string(),
            shelf_life_days: None,
            low_stock_threshold: 0,
            image_url: None,
            created_at: Utc::now(),
            is_archived: archived,
        }
    }

    #[test]
    fn test_shelf_life_required_for_ingredient() {
        assert!(validate_shelf_life(ProductCategory::Ingredient, Some(10)).is_ok());
        assert_eq!(
            validate_shelf_life(ProductCategory::Ingredient, None).unwrap_err().code(),
            "INVALID_SHELF_LIFE"
        );
        assert!(validate_shelf_life(ProductCategory::Ingredient, Some(0)).is_err());
        assert!(validate_shelf_life(ProductCategory::Ingredient, Some(-3)).is_err());
    }

    #[test]
    fn test_shelf_life_rejected_for_non_ingredient() {
        assert!(validate_shelf_life(ProductCategory::NonIngredient, None).is_ok());
        assert!(validate_shelf_life(ProductCategory::NonIngredient, Some(5)).is_err());
    }

    #[test]
    fn test_threshold_non_negative() {
        assert!(validate_threshold(0).is_ok());
        assert!(validate_threshold(12).is_ok());
        assert_eq!(validate_threshold(-1), Err(LedgerError::InvalidThreshold));
    }

    #[test]
    fn test_duplicate_name_among_active_products() {
        let existing = vec![product("Flour", false), product("Sugar", true)];

        assert_eq!(
            ensure_unique_name(" flour ", None, &existing),
            Err(LedgerError::DuplicateName("flour".to_string()))
        );
        // Archived products free their name
        assert!(ensure_unique_name("Sugar", None, &existing).is_ok());
        // Renaming a product to its own name is fine
        assert!(ensure_unique_name("FLOUR", Some(existing[0].id), &existing).is_ok());
    }

    #[test]
    fn test_receipt_quantity_and_cost() {
        assert!(validate_receipt_quantity(Decimal::ONE).is_ok());
        assert_eq!(validate_receipt_quantity(Decimal::ZERO), Err(LedgerError::InvalidQuantity));
        assert!(validate_unit_cost(Decimal::ZERO).is_ok());
        assert_eq!(validate_unit_cost(Decimal::NEGATIVE_ONE), Err(LedgerError::InvalidUnitCost));
    }

    #[test]
    fn test_receipt_bounds_keep_valuation_in_range() {
        let huge = Decimal::from_str("100000000000000000").unwrap();
        assert_eq!(validate_receipt_quantity(huge), Err(LedgerError::InvalidQuantity));
        assert_eq!(validate_unit_cost(huge), Err(LedgerError::InvalidUnitCost));

        assert!(validate_receipt_quantity(MAX_QUANTITY).is_ok());
        assert!(validate_unit_cost(MAX_UNIT_COST).is_ok());
        assert!(validate_receipt_quantity(MAX_QUANTITY + Decimal::ONE).is_err());

        // Postgres would round these away
        let fine = Decimal::from_str("0.00001").unwrap();
        assert_eq!(validate_receipt_quantity(fine), Err(LedgerError::InvalidQuantity));
        assert_eq!(validate_unit_cost(fine), Err(LedgerError::InvalidUnitCost));
        assert!(validate_unit_cost(Decimal::from_str("0.0125").unwrap()).is_ok());

        // The largest batch still values without overflow
        assert!(MAX_QUANTITY.checked_mul(MAX_UNIT_COST).is_some());
    }

    #[test]
    fn test_movement_quantity_is_signed_and_bounded() {
        assert!(validate_movement_quantity(Decimal::NEGATIVE_ONE).is_ok());
        assert!(validate_movement_quantity(Decimal::ONE).is_ok());
        assert_eq!(validate_movement_quantity(Decimal::ZERO), Err(LedgerError::ZeroQuantityMovement));
        assert_eq!(
            validate_movement_quantity(Decimal::MIN),
            Err(LedgerError::InvalidQuantity)
        );
    }

    #[test]
    fn test_timestamp_bounds() {
        let now = Utc::now();
        let received = now - Duration::days(3);

        assert!(validate_timestamp(now - Duration::days(1), Some(received), now).is_ok());
        assert!(validate_timestamp(received, Some(received), now).is_ok());
        assert!(validate_timestamp(now + Duration::minutes(5), None, now).is_err());
        assert!(validate_timestamp(received - Duration::seconds(1), Some(received), now).is_err());
    }
}
