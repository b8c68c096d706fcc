//! Product catalog models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A product definition that batches are received against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    /// Display label for quantities (e.g. "kg", "bottle")
    pub unit: String,
    /// Present only for ingredients
    pub shelf_life_days: Option<i32>,
    pub low_stock_threshold: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_archived: bool,
}

impl Product {
    pub fn is_ingredient(&self) -> bool {
        self.category == ProductCategory::Ingredient
    }

    /// Expiry date for a batch produced on `production_date`, if this product expires
    pub fn expiry_for(&self, production_date: NaiveDate) -> Option<NaiveDate> {
        match (self.category, self.shelf_life_days) {
            (ProductCategory::Ingredient, Some(days)) => {
                production_date.checked_add_days(chrono::Days::new(days.max(0) as u64))
            }
            _ => None,
        }
    }
}

/// Product category; fixed at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Ingredient,
    NonIngredient,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Ingredient => "INGREDIENT",
            ProductCategory::NonIngredient => "NON_INGREDIENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INGREDIENT" => Some(ProductCategory::Ingredient),
            "NON_INGREDIENT" => Some(ProductCategory::NonIngredient),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductCategory::Ingredient => write!(f, "Ingredient"),
            ProductCategory::NonIngredient => write!(f, "Non-ingredient"),
        }
    }
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub name: String,
    pub category: ProductCategory,
    #[validate(length(min = 1, max = 32), custom = "not_blank")]
    pub unit: String,
    pub shelf_life_days: Option<i32>,
    pub low_stock_threshold: i32,
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Input for updating a product; the category cannot change
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32), custom = "not_blank")]
    pub unit: Option<String>,
    pub shelf_life_days: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Names and units are stored trimmed, so whitespace alone is empty
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
