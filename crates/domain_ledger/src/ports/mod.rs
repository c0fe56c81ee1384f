//! Ledger Ports
//!
//! The ledger engine owns these traits; infrastructure crates implement them.
//!
//! - [`LedgerPort`]: persistence and live snapshots of ledger entries
//! - [`CatalogPort`](crate::catalog::CatalogPort): product and variant lookups
//! - [`InventoryPort`]: physical stock movements
//! - [`IdentityProvider`]: who is acting
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_ledger::ports::LedgerPort;
//! use std::sync::Arc;
//!
//! let port: Arc<dyn LedgerPort> = Arc::new(PostgresLedgerAdapter::new(pool, stream_config));
//! let entries = port.list_entries(distributor_id).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{
    ActorId, DistributorId, DomainPort, HealthCheckable, LedgerEntryId, Money, PortError,
    ProductId, VariantId,
};

use crate::entry::{DebitPaymentUpdate, LedgerEntry};
use crate::subscription::LedgerSubscription;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// Persistence for ledger entries
#[async_trait]
pub trait LedgerPort: DomainPort + HealthCheckable {
    /// Stores a new entry; the id must not exist yet
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), PortError>;

    /// Fetches one entry
    async fn get_entry(&self, id: LedgerEntryId) -> Result<LedgerEntry, PortError>;

    /// All entries of a distributor, newest first
    async fn list_entries(&self, distributor_id: DistributorId) -> Result<Vec<LedgerEntry>, PortError>;

    /// Rewrites the payment-tracking fields of a debit and returns the result
    ///
    /// This is the only mutation an adapter may perform on a stored entry.
    /// The write only lands while the stored `paid_amount` still equals
    /// `expected_paid`; otherwise it fails with [`PortError::Conflict`] and
    /// nothing changes.
    async fn update_debit_payment(
        &self,
        id: LedgerEntryId,
        expected_paid: Money,
        update: &DebitPaymentUpdate,
    ) -> Result<LedgerEntry, PortError>;

    /// Live snapshots of a distributor's ledger
    ///
    /// The subscription starts with the current snapshot and re-emits the
    /// full ledger after every change.
    async fn subscribe(&self, distributor_id: DistributorId) -> Result<LedgerSubscription, PortError>;
}

/// Instruction to move stock from a distributor back to the main warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReturnRequest {
    pub distributor_id: DistributorId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub notes: String,
}

/// Physical stock mutations
#[async_trait]
pub trait InventoryPort: DomainPort {
    async fn return_stock(&self, request: &StockReturnRequest) -> Result<(), PortError>;
}

/// Resolves the acting user for writes
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_actor(&self) -> Option<ActorId>;
}

/// Identity fixed at construction, e.g. from a verified bearer token
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity(Option<ActorId>);

impl FixedIdentity {
    pub fn new(actor: ActorId) -> Self {
        Self(Some(actor))
    }

    /// An identity that never resolves; every write fails authorization
    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn current_actor(&self) -> Option<ActorId> {
        self.0.clone()
    }
}
