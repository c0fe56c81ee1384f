//! Catalog collaborator
//!
//! The engine only reads the catalog: prices and distributor costs for the
//! product and variant being reverted. [`CachedCatalog`] is an injected
//! read-through cache that can sit in front of any [`CatalogPort`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use core_kernel::{DomainPort, PortError, ProductId, VariantId};

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Retail price, VAT included
    pub price: Decimal,
    /// Per-unit distributor cost before tax, when set
    pub distributor_cost: Option<Decimal>,
}

/// A sellable variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    /// Overrides the product price when set
    pub price: Option<Decimal>,
    pub distributor_cost: Option<Decimal>,
}

/// The line item a revert or cost lookup is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub product_name: String,
    pub variant_name: String,
    /// Caller-known price used when the catalog cannot be reached
    pub base_price: Option<Decimal>,
}

impl LineItem {
    pub fn new(
        product_id: ProductId,
        variant_id: VariantId,
        product_name: impl Into<String>,
        variant_name: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            variant_id,
            product_name: product_name.into(),
            variant_name: variant_name.into(),
            base_price: None,
        }
    }

    pub fn with_base_price(mut self, base_price: Decimal) -> Self {
        self.base_price = Some(base_price);
        self
    }
}

/// Read access to products and variants
#[async_trait]
pub trait CatalogPort: DomainPort {
    /// Looks up a product; `Ok(None)` when it does not exist
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, PortError>;

    /// Looks up a variant; `Ok(None)` when it does not exist
    async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>, PortError>;
}

struct CacheSlot<T> {
    value: T,
    stored_at: Instant,
}

struct TtlMap<K, V> {
    slots: RwLock<HashMap<K, CacheSlot<V>>>,
}

impl<K: Eq + Hash + Copy, V: Clone> TtlMap<K, V> {
    fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        let slots = self.slots.read().await;
        slots
            .get(key)
            .filter(|slot| slot.stored_at.elapsed() < ttl)
            .map(|slot| slot.value.clone())
    }

    async fn put(&self, key: K, value: V) {
        self.slots.write().await.insert(
            key,
            CacheSlot {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    async fn remove(&self, key: &K) {
        self.slots.write().await.remove(key);
    }

    async fn clear(&self) {
        self.slots.write().await.clear();
    }
}

/// Read-through TTL cache over a catalog
///
/// Both hits and misses (`None`) are cached; errors are not.
pub struct CachedCatalog {
    inner: Arc<dyn CatalogPort>,
    ttl: Duration,
    products: TtlMap<ProductId, Option<Product>>,
    variants: TtlMap<VariantId, Option<Variant>>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn CatalogPort>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            products: TtlMap::new(),
            variants: TtlMap::new(),
        }
    }

    pub async fn invalidate_product(&self, id: ProductId) {
        self.products.remove(&id).await;
    }

    pub async fn invalidate_variant(&self, id: VariantId) {
        self.variants.remove(&id).await;
    }

    pub async fn clear(&self) {
        self.products.clear().await;
        self.variants.clear().await;
    }
}

impl DomainPort for CachedCatalog {}

#[async_trait]
impl CatalogPort for CachedCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, PortError> {
        if let Some(cached) = self.products.get(&id, self.ttl).await {
            debug!(product_id = %id, "catalog cache hit");
            return Ok(cached);
        }
        let product = self.inner.get_product(id).await?;
        self.products.put(id, product.clone()).await;
        Ok(product)
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>, PortError> {
        if let Some(cached) = self.variants.get(&id, self.ttl).await {
            debug!(variant_id = %id, "catalog cache hit");
            return Ok(cached);
        }
        let variant = self.inner.get_variant(id).await?;
        self.variants.put(id, variant.clone()).await;
        Ok(variant)
    }
}
