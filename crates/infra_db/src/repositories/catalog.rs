//! Catalog and inventory repositories
//!
//! The ledger reads products and variants and moves stock through the
//! `inventory_return_stock` SQL function; it never writes the catalog.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Read access to `products` and `product_variants`
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_product(&self, product_id: Uuid) -> Result<Option<ProductRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT product_id, name, price, distributor_cost
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_variant(&self, variant_id: Uuid) -> Result<Option<VariantRow>, DatabaseError> {
        let row = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT variant_id, product_id, name, price, distributor_cost
            FROM product_variants
            WHERE variant_id = $1
            "#,
        )
        .bind(variant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProductRow {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub distributor_cost: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VariantRow {
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: Option<Decimal>,
    pub distributor_cost: Option<Decimal>,
}

/// Stock movements between distributors and the main warehouse
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Moves `quantity` units of a variant from the distributor to the warehouse
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` when the distributor holds fewer units.
    pub async fn return_stock(&self, stock: &StockReturnRow) -> Result<(), DatabaseError> {
        sqlx::query("SELECT inventory_return_stock($1, $2, $3, $4, $5)")
            .bind(stock.distributor_id)
            .bind(stock.product_id)
            .bind(stock.variant_id)
            .bind(stock.quantity)
            .bind(&stock.notes)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Arguments of `inventory_return_stock`
#[derive(Debug, Clone, PartialEq)]
pub struct StockReturnRow {
    pub distributor_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    pub notes: String,
}
