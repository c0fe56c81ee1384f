//! PostgreSQL catalog and inventory adapters

use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, PortError, ProductId, VariantId,
};
use domain_ledger::{CatalogPort, InventoryPort, Product, StockReturnRequest, Variant};

use crate::error::DatabaseError;
use crate::repositories::catalog::{
    CatalogRepository, InventoryRepository, ProductRow, StockReturnRow, VariantRow,
};

async fn ping(pool: &PgPool) -> Result<(), PortError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(|e| PortError::from(DatabaseError::from(e)))
}

/// Reads products and variants from the catalog tables
#[derive(Debug, Clone)]
pub struct PostgresCatalogAdapter {
    repository: CatalogRepository,
    pool: PgPool,
}

impl PostgresCatalogAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CatalogRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresCatalogAdapter {}

#[async_trait]
impl HealthCheckable for PostgresCatalogAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        HealthCheckResult::from_probe("postgres-catalog-adapter", started, ping(&self.pool).await)
    }
}

#[async_trait]
impl CatalogPort for PostgresCatalogAdapter {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, PortError> {
        debug!("loading product");
        let row = self.repository.find_product(id.into()).await?;
        Ok(row.map(row_to_product))
    }

    #[instrument(skip(self), fields(variant_id = %id))]
    async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>, PortError> {
        debug!("loading variant");
        let row = self.repository.find_variant(id.into()).await?;
        Ok(row.map(row_to_variant))
    }
}

fn row_to_product(row: ProductRow) -> Product {
    Product {
        id: ProductId::from(row.product_id),
        name: row.name,
        price: row.price,
        distributor_cost: row.distributor_cost,
    }
}

fn row_to_variant(row: VariantRow) -> Variant {
    Variant {
        id: VariantId::from(row.variant_id),
        product_id: ProductId::from(row.product_id),
        name: row.name,
        price: row.price,
        distributor_cost: row.distributor_cost,
    }
}

/// Moves stock through the `inventory_return_stock` SQL function
#[derive(Debug, Clone)]
pub struct PostgresInventoryAdapter {
    repository: InventoryRepository,
    pool: PgPool,
}

impl PostgresInventoryAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: InventoryRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresInventoryAdapter {}

#[async_trait]
impl HealthCheckable for PostgresInventoryAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        HealthCheckResult::from_probe("postgres-inventory-adapter", started, ping(&self.pool).await)
    }
}

#[async_trait]
impl InventoryPort for PostgresInventoryAdapter {
    #[instrument(skip(self, request), fields(distributor_id = %request.distributor_id, variant_id = %request.variant_id))]
    async fn return_stock(&self, request: &StockReturnRequest) -> Result<(), PortError> {
        let row = stock_return_row(request)?;
        self.repository.return_stock(&row).await?;
        info!(quantity = request.quantity, "stock returned to main warehouse");
        Ok(())
    }
}

fn stock_return_row(request: &StockReturnRequest) -> Result<StockReturnRow, PortError> {
    let quantity = i32::try_from(request.quantity)
        .map_err(|_| PortError::validation_field("quantity is too large", "quantity"))?;
    Ok(StockReturnRow {
        distributor_id: request.distributor_id.into(),
        product_id: request.product_id.into(),
        variant_id: request.variant_id.into(),
        quantity,
        notes: request.notes.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::DistributorId;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_variant_row_keeps_optional_overrides() {
        let row = VariantRow {
            variant_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            name: "Negro/M".into(),
            price: None,
            distributor_cost: Some(dec!(12.50)),
        };
        let variant = row_to_variant(row.clone());
        assert_eq!(Uuid::from(variant.id), row.variant_id);
        assert_eq!(variant.price, None);
        assert_eq!(variant.distributor_cost, Some(dec!(12.50)));
    }

    #[test]
    fn test_product_row_conversion() {
        let product = row_to_product(ProductRow {
            product_id: Uuid::new_v4(),
            name: "Pantalón Sendero".into(),
            price: dec!(57.50),
            distributor_cost: None,
        });
        assert_eq!(product.price, dec!(57.50));
        assert!(product.distributor_cost.is_none());
    }

    #[test]
    fn test_stock_return_quantity_must_fit_integer_column() {
        let mut request = StockReturnRequest {
            distributor_id: DistributorId::new(),
            product_id: ProductId::new(),
            variant_id: VariantId::new(),
            quantity: 3,
            notes: "Devolución de 3 x Pantalón Sendero (Negro/M)".into(),
        };
        assert_eq!(stock_return_row(&request).unwrap().quantity, 3);

        request.quantity = u32::MAX;
        assert!(matches!(stock_return_row(&request), Err(PortError::Validation { .. })));
    }
}
