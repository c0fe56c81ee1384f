//! Ledger service
//!
//! The operations the API layer calls. Holds the collaborator ports and
//! wires the store, matcher, payment state machine, summary aggregator and
//! revert workflow together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{CoreError, DistributorId, HealthCheckResult, LedgerEntryId, Money, TransferId};

use crate::catalog::{CachedCatalog, CatalogPort, LineItem};
use crate::config::LedgerConfig;
use crate::cost::CostResolver;
use crate::description::DescriptionCodec;
use crate::entry::{LedgerEntry, NewEntry, PaymentDetails, SourceType};
use crate::error::LedgerError;
use crate::matcher::{DebitView, ReturnMatcher};
use crate::payment::{PaymentReceipt, PaymentStateMachine};
use crate::ports::{IdentityProvider, InventoryPort, LedgerPort};
use crate::revert::{RevertOutcome, RevertQuote, RevertRequest, RevertWorkflow};
use crate::store::LedgerStore;
use crate::subscription::LedgerSubscription;
use crate::summary::{EnhancedLedgerSummary, SummaryAggregator};

/// Request to book a debit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDebit {
    pub distributor_id: DistributorId,
    pub amount: Decimal,
    pub description: String,
    pub source_type: SourceType,
    pub source_id: Uuid,
    pub due_date: Option<DateTime<Utc>>,
    pub related_transfer_id: Option<TransferId>,
}

impl RegisterDebit {
    /// Debit for a stock transfer, with the description in codec format
    pub fn for_transfer(
        distributor_id: DistributorId,
        transfer_id: TransferId,
        amount: Decimal,
        quantity: u32,
        product: &str,
        variant: &str,
    ) -> Self {
        Self {
            distributor_id,
            amount,
            description: DescriptionCodec::render_transfer(quantity, product, variant),
            source_type: SourceType::Transfer,
            source_id: Uuid::from(transfer_id),
            due_date: None,
            related_transfer_id: Some(transfer_id),
        }
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Request to book a manual payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPayment {
    pub distributor_id: DistributorId,
    pub amount: Decimal,
    pub description: String,
    pub details: PaymentDetails,
}

/// Outcome of [`LedgerService::register_payment`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentRegistration {
    /// Payment on account, not tied to a debit
    OnAccount { credit: LedgerEntry },
    /// Payment settling a specific debit
    AgainstDebit { receipt: Box<PaymentReceipt> },
}

impl PaymentRegistration {
    pub fn credit(&self) -> &LedgerEntry {
        match self {
            PaymentRegistration::OnAccount { credit } => credit,
            PaymentRegistration::AgainstDebit { receipt } => &receipt.credit,
        }
    }
}

/// Façade over the ledger engine
#[derive(Clone)]
pub struct LedgerService {
    ledger: Arc<dyn LedgerPort>,
    catalog: Arc<dyn CatalogPort>,
    inventory: Arc<dyn InventoryPort>,
    config: LedgerConfig,
    store: LedgerStore,
    matcher: ReturnMatcher,
    payments: PaymentStateMachine,
    summaries: SummaryAggregator,
    reverts: RevertWorkflow,
}

impl LedgerService {
    /// Builds the service; the catalog is wrapped in a [`CachedCatalog`]
    pub fn new(
        ledger: Arc<dyn LedgerPort>,
        catalog: Arc<dyn CatalogPort>,
        inventory: Arc<dyn InventoryPort>,
        identity: Arc<dyn IdentityProvider>,
        config: LedgerConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let catalog: Arc<dyn CatalogPort> =
            Arc::new(CachedCatalog::new(catalog, config.catalog_cache_ttl()));
        Ok(Self::assemble(ledger, catalog, inventory, identity, config))
    }

    fn assemble(
        ledger: Arc<dyn LedgerPort>,
        catalog: Arc<dyn CatalogPort>,
        inventory: Arc<dyn InventoryPort>,
        identity: Arc<dyn IdentityProvider>,
        config: LedgerConfig,
    ) -> Self {
        let store = LedgerStore::new(ledger.clone(), identity, config.currency);
        let matcher = ReturnMatcher::from_config(&config);
        let costs = CostResolver::new(catalog.clone(), &config);
        Self {
            payments: PaymentStateMachine::new(store.clone(), matcher.clone()),
            summaries: SummaryAggregator::new(matcher.clone(), config.currency),
            reverts: RevertWorkflow::new(store.clone(), costs, inventory.clone(), &config),
            ledger,
            catalog,
            inventory,
            config,
            store,
            matcher,
        }
    }

    /// The same service acting as another identity (one per request)
    pub fn for_identity(&self, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::assemble(
            self.ledger.clone(),
            self.catalog.clone(),
            self.inventory.clone(),
            identity,
            self.config.clone(),
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Direct access to the two revert phases
    pub fn reverts(&self) -> &RevertWorkflow {
        &self.reverts
    }

    /// Books a debit for a transfer or distributor order
    #[instrument(skip(self, request), fields(distributor_id = %request.distributor_id))]
    pub async fn register_debit(&self, request: RegisterDebit) -> Result<LedgerEntry, LedgerError> {
        if !request.source_type.is_debt_source() {
            return Err(LedgerError::validation(format!(
                "debits must come from a transfer or distributor order, not {}",
                request.source_type
            )));
        }
        let mut entry = NewEntry::debit(
            request.distributor_id,
            Money::new(request.amount, self.config.currency),
            request.description,
            request.source_type,
            request.source_id,
        );
        if let Some(due_date) = request.due_date {
            entry = entry.due(due_date);
        }
        if let Some(transfer_id) = request.related_transfer_id {
            entry = entry.related_transfer(transfer_id);
        }
        self.store.append(entry).await
    }

    /// Books a manual payment
    ///
    /// A payment naming a parent debit goes through
    /// [`LedgerService::mark_debit_as_paid`] so the debit's tracking stays
    /// in step with the credit.
    #[instrument(skip(self, request), fields(distributor_id = %request.distributor_id))]
    pub async fn register_payment(&self, request: RegisterPayment) -> Result<PaymentRegistration, LedgerError> {
        if let Some(debit_id) = request.details.parent_debit_id {
            let debit = self.store.get(debit_id).await?;
            if debit.distributor_id != request.distributor_id {
                return Err(LedgerError::validation(format!(
                    "debit {} does not belong to distributor {}",
                    debit_id, request.distributor_id
                )));
            }
            let receipt = self
                .mark_debit_as_paid(debit_id, request.amount, request.details)
                .await?;
            return Ok(PaymentRegistration::AgainstDebit {
                receipt: Box::new(receipt),
            });
        }

        let description = if request.description.trim().is_empty() {
            DescriptionCodec::render_payment(request.details.payment_method.as_str())
        } else {
            request.description
        };
        let entry = NewEntry::credit(
            request.distributor_id,
            Money::new(request.amount, self.config.currency),
            description,
            SourceType::ManualPayment,
            Uuid::now_v7(),
        )
        .with_payment_details(request.details);
        let credit = self.store.append(entry).await?;
        Ok(PaymentRegistration::OnAccount { credit })
    }

    #[instrument(skip(self, details))]
    pub async fn mark_debit_as_paid(
        &self,
        debit_id: LedgerEntryId,
        paid_amount: Decimal,
        details: PaymentDetails,
    ) -> Result<PaymentReceipt, LedgerError> {
        self.payments.mark_debit_as_paid(debit_id, paid_amount, details).await
    }

    /// Live snapshots of a distributor's ledger
    pub async fn get_ledger_entries(&self, distributor_id: DistributorId) -> Result<LedgerSubscription, LedgerError> {
        self.store.stream(distributor_id).await
    }

    /// One snapshot of a distributor's ledger, newest first
    pub async fn ledger_snapshot(&self, distributor_id: DistributorId) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.store.entries(distributor_id).await
    }

    /// Return-adjusted views of every debit, newest first
    pub async fn debit_views(&self, distributor_id: DistributorId) -> Result<Vec<DebitView>, LedgerError> {
        let entries = self.store.entries(distributor_id).await?;
        Ok(self.matcher.assess_all(&entries))
    }

    pub fn calculate_enhanced_summary(&self, entries: &[LedgerEntry]) -> EnhancedLedgerSummary {
        self.summaries.summarize(entries, Utc::now())
    }

    pub fn calculate_enhanced_summary_at(
        &self,
        entries: &[LedgerEntry],
        now: DateTime<Utc>,
    ) -> EnhancedLedgerSummary {
        self.summaries.summarize(entries, now)
    }

    pub async fn distributor_summary(&self, distributor_id: DistributorId) -> Result<EnhancedLedgerSummary, LedgerError> {
        let entries = self.store.entries(distributor_id).await?;
        Ok(self.calculate_enhanced_summary(&entries))
    }

    pub async fn can_revert(
        &self,
        distributor_id: DistributorId,
        item: &LineItem,
        quantity: u32,
    ) -> Result<RevertQuote, LedgerError> {
        self.reverts.can_revert(distributor_id, item, quantity).await
    }

    /// Validates and executes a stock reversal
    #[instrument(skip(self, request), fields(distributor_id = %request.distributor_id, quantity = request.quantity))]
    pub async fn revert_transfer(&self, request: RevertRequest) -> Result<RevertOutcome, LedgerError> {
        self.reverts.revert_transfer(&request).await
    }

    pub async fn health(&self) -> HealthCheckResult {
        self.store.health().await
    }
}
