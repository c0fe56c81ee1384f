//! In-memory adapters for tests
//!
//! [`InMemoryLedger`] publishes a fresh snapshot on every write so that
//! subscriptions behave like the live Postgres stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, Mutex, RwLock};

use core_kernel::{
    AdapterHealth, DistributorId, DomainPort, HealthCheckResult, HealthCheckable, LedgerEntryId,
    Money, PortError, ProductId, VariantId,
};

use super::{InventoryPort, LedgerPort, StockReturnRequest};
use crate::catalog::{CatalogPort, Product, Variant};
use crate::entry::{sort_newest_first, DebitPaymentUpdate, LedgerEntry};
use crate::subscription::{LedgerSnapshot, LedgerSubscription};

fn mock_health(adapter_id: &str) -> HealthCheckResult {
    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status: AdapterHealth::Healthy,
        latency_ms: 0,
        message: Some("Mock adapter always healthy".to_string()),
        checked_at: Utc::now(),
    }
}

/// In-memory ledger with live snapshots
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: RwLock<HashMap<LedgerEntryId, LedgerEntry>>,
    channels: Mutex<HashMap<DistributorId, watch::Sender<LedgerSnapshot>>>,
    fail_writes: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates with entries, bypassing validation (for aged fixtures)
    pub async fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        let ledger = Self::new();
        for entry in entries {
            ledger.seed(entry).await;
        }
        ledger
    }

    pub async fn seed(&self, entry: LedgerEntry) {
        let distributor_id = entry.distributor_id;
        self.entries.write().await.insert(entry.id, entry);
        self.publish(distributor_id).await;
    }

    /// Makes every subsequent insert and update fail with a connection error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn snapshot(&self, distributor_id: DistributorId) -> Vec<LedgerEntry> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|e| e.distributor_id == distributor_id)
            .cloned()
            .collect();
        sort_newest_first(&mut entries);
        entries
    }

    async fn publish(&self, distributor_id: DistributorId) {
        let snapshot = Arc::new(self.snapshot(distributor_id).await);
        if let Some(sender) = self.channels.lock().await.get(&distributor_id) {
            sender.send_replace(snapshot);
        }
    }

    fn check_writable(&self) -> Result<(), PortError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::connection("in-memory ledger is rejecting writes"));
        }
        Ok(())
    }
}

impl DomainPort for InMemoryLedger {}

#[async_trait]
impl HealthCheckable for InMemoryLedger {
    async fn health_check(&self) -> HealthCheckResult {
        mock_health("mock-ledger")
    }
}

#[async_trait]
impl LedgerPort for InMemoryLedger {
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), PortError> {
        self.check_writable()?;
        {
            let mut entries = self.entries.write().await;
            if entries.contains_key(&entry.id) {
                return Err(PortError::Conflict {
                    message: format!("entry {} already exists", entry.id),
                });
            }
            entries.insert(entry.id, entry.clone());
        }
        self.publish(entry.distributor_id).await;
        Ok(())
    }

    async fn get_entry(&self, id: LedgerEntryId) -> Result<LedgerEntry, PortError> {
        self.entries
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("LedgerEntry", id))
    }

    async fn list_entries(&self, distributor_id: DistributorId) -> Result<Vec<LedgerEntry>, PortError> {
        Ok(self.snapshot(distributor_id).await)
    }

    async fn update_debit_payment(
        &self,
        id: LedgerEntryId,
        expected_paid: Money,
        update: &DebitPaymentUpdate,
    ) -> Result<LedgerEntry, PortError> {
        self.check_writable()?;
        let updated = {
            let mut entries = self.entries.write().await;
            let entry = entries
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("LedgerEntry", id))?;
            let stored_paid = entry.manual_paid();
            if stored_paid.amount() != expected_paid.amount() {
                return Err(PortError::Conflict {
                    message: format!(
                        "debit {} paid_amount is {}, expected {}",
                        id,
                        stored_paid.amount(),
                        expected_paid.amount()
                    ),
                });
            }
            entry
                .apply_payment_update(update)
                .map_err(|e| PortError::validation(e.to_string()))?;
            entry.clone()
        };
        self.publish(updated.distributor_id).await;
        Ok(updated)
    }

    async fn subscribe(&self, distributor_id: DistributorId) -> Result<LedgerSubscription, PortError> {
        let snapshot = Arc::new(self.snapshot(distributor_id).await);
        let mut channels = self.channels.lock().await;
        let sender = channels
            .entry(distributor_id)
            .or_insert_with(|| watch::channel(snapshot.clone()).0);
        sender.send_replace(snapshot);
        Ok(LedgerSubscription::new(sender.subscribe()))
    }
}

/// In-memory catalog with a failure switch and lookup counters
#[derive(Debug, Default)]
pub struct MockCatalog {
    products: HashMap<ProductId, Product>,
    variants: HashMap<VariantId, Variant>,
    failing: AtomicBool,
    product_lookups: AtomicUsize,
    variant_lookups: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.insert(product.id, product);
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.insert(variant.id, variant);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn product_lookups(&self) -> usize {
        self.product_lookups.load(Ordering::SeqCst)
    }

    pub fn variant_lookups(&self) -> usize {
        self.variant_lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "catalog".to_string(),
            });
        }
        Ok(())
    }
}

impl DomainPort for MockCatalog {}

#[async_trait]
impl CatalogPort for MockCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, PortError> {
        self.product_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.products.get(&id).cloned())
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>, PortError> {
        self.variant_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.variants.get(&id).cloned())
    }
}

/// Inventory that records every stock return it accepts
#[derive(Debug, Default)]
pub struct MockInventory {
    returns: Mutex<Vec<StockReturnRequest>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `return_stock` calls, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn accepted_returns(&self) -> Vec<StockReturnRequest> {
        self.returns.lock().await.clone()
    }

    /// Units of a variant returned so far
    pub async fn returned_units(&self, variant_id: VariantId) -> u32 {
        self.returns
            .lock()
            .await
            .iter()
            .filter(|r| r.variant_id == variant_id)
            .map(|r| r.quantity)
            .sum()
    }
}

impl DomainPort for MockInventory {}

#[async_trait]
impl InventoryPort for MockInventory {
    async fn return_stock(&self, request: &StockReturnRequest) -> Result<(), PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "inventory".to_string(),
            });
        }
        self.returns.lock().await.push(request.clone());
        Ok(())
    }
}
