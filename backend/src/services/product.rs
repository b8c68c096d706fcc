//! Product catalog service

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::{
    ensure_unique_name, validate_shelf_life, validate_threshold, CreateProductInput, LedgerError,
    Product, UpdateProductInput,
};

use super::{is_unique_violation, now};
use crate::error::{AppError, AppResult};
use crate::models::{into_domain, ProductRow, PRODUCT_COLUMNS};

/// Product service for catalog maintenance
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product after checking shelf life, threshold and name uniqueness
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        validate_shelf_life(input.category, input.shelf_life_days)?;
        validate_threshold(input.low_stock_threshold)?;

        let mut conn = self.db.acquire().await?;
        let existing = active_products_named(&mut conn, &input.name).await?;
        ensure_unique_name(&input.name, None, &existing)?;

        let product = Product {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            category: input.category,
            unit: input.unit,
            shelf_life_days: input.shelf_life_days,
            low_stock_threshold: input.low_stock_threshold,
            image_url: input.image_url,
            created_at: now(),
            is_archived: false,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, unit, shelf_life_days, low_stock_threshold,
                image_url, created_at, is_archived
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(&product.unit)
        .bind(product.shelf_life_days)
        .bind(product.low_stock_threshold)
        .bind(&product.image_url)
        .bind(product.created_at)
        .bind(product.is_archived)
        .execute(&mut *conn)
        .await
        .map_err(|e| duplicate_or_database(e, &product.name))?;

        tracing::info!(
            product_id = %product.id,
            category = %product.category,
            "Created product {}",
            product.name
        );
        Ok(product)
    }

    /// Get a product by ID, archived or not
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let mut conn = self.db.acquire().await?;
        fetch_product(&mut conn, product_id).await
    }

    /// List products by name, optionally including archived ones
    pub async fn list_products(&self, include_archived: bool) -> AppResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE $1 OR NOT is_archived \
             ORDER BY LOWER(name), name"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(include_archived)
            .fetch_all(&self.db)
            .await?;

        into_domain(rows)
    }

    /// Update editable fields; the category is fixed at creation
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let mut product = fetch_product(&mut tx, product_id).await?;

        if let Some(name) = input.name {
            if !product.is_archived {
                let existing = active_products_named(&mut tx, &name).await?;
                ensure_unique_name(&name, Some(product.id), &existing)?;
            }
            product.name = name.trim().to_string();
        }
        if let Some(unit) = input.unit {
            product.unit = unit;
        }
        if input.shelf_life_days.is_some() {
            product.shelf_life_days = input.shelf_life_days;
        }
        if let Some(threshold) = input.low_stock_threshold {
            validate_threshold(threshold)?;
            product.low_stock_threshold = threshold;
        }
        if input.image_url.is_some() {
            product.image_url = input.image_url;
        }
        validate_shelf_life(product.category, product.shelf_life_days)?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, unit = $3, shelf_life_days = $4,
                low_stock_threshold = $5, image_url = $6
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.unit)
        .bind(product.shelf_life_days)
        .bind(product.low_stock_threshold)
        .bind(&product.image_url)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_or_database(e, &product.name))?;

        tx.commit().await?;

        tracing::info!(product_id = %product.id, "Updated product");
        Ok(product)
    }

    /// Hide a product from active listings and new receipts
    pub async fn archive_product(&self, product_id: Uuid) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;
        let mut product = fetch_product(&mut tx, product_id).await?;
        if product.is_archived {
            return Ok(product);
        }

        set_archived(&mut tx, product_id, true).await?;
        tx.commit().await?;

        product.is_archived = true;
        tracing::info!(product_id = %product_id, "Archived product");
        Ok(product)
    }

    /// Restore an archived product, provided no active product took its name meanwhile
    pub async fn unarchive_product(&self, product_id: Uuid) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;
        let mut product = fetch_product(&mut tx, product_id).await?;
        if !product.is_archived {
            return Ok(product);
        }

        let existing = active_products_named(&mut tx, &product.name).await?;
        ensure_unique_name(&product.name, Some(product.id), &existing)?;

        set_archived(&mut tx, product_id, false)
            .await
            .map_err(|e| duplicate_or_database(e, &product.name))?;
        tx.commit().await?;

        product.is_archived = false;
        tracing::info!(product_id = %product_id, "Unarchived product");
        Ok(product)
    }
}

pub(crate) async fn fetch_product(conn: &mut PgConnection, product_id: Uuid) -> AppResult<Product> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(LedgerError::ProductNotFound(product_id))?;

    row.try_into()
}

async fn active_products_named(conn: &mut PgConnection, name: &str) -> AppResult<Vec<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE NOT is_archived AND LOWER(TRIM(name)) = LOWER(TRIM($1))"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(name)
        .fetch_all(&mut *conn)
        .await?;

    into_domain(rows)
}

async fn set_archived(
    conn: &mut PgConnection,
    product_id: Uuid,
    archived: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET is_archived = $2 WHERE id = $1")
        .bind(product_id)
        .bind(archived)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// A concurrent insert can still win the unique index race
fn duplicate_or_database(error: sqlx::Error, name: &str) -> AppError {
    if is_unique_violation(&error) {
        LedgerError::DuplicateName(name.trim().to_string()).into()
    } else {
        error.into()
    }
}
