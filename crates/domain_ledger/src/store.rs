//! LedgerStore: validated access to the append-only ledger

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use core_kernel::{ActorId, Currency, DistributorId, HealthCheckResult, LedgerEntryId, Money};

use crate::entry::{DebitPaymentUpdate, LedgerEntry, NewEntry};
use crate::error::LedgerError;
use crate::ports::{IdentityProvider, LedgerPort};
use crate::subscription::LedgerSubscription;

/// Append-only, per-distributor ledger
///
/// Every write is stamped with the acting identity; writes without one fail
/// with [`LedgerError::Authorization`] before the port is touched.
#[derive(Clone)]
pub struct LedgerStore {
    port: Arc<dyn LedgerPort>,
    identity: Arc<dyn IdentityProvider>,
    currency: Currency,
}

impl LedgerStore {
    pub fn new(
        port: Arc<dyn LedgerPort>,
        identity: Arc<dyn IdentityProvider>,
        currency: Currency,
    ) -> Self {
        Self {
            port,
            identity,
            currency,
        }
    }

    /// Same store acting as a different identity
    pub fn with_identity(&self, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            port: self.port.clone(),
            identity,
            currency: self.currency,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Resolves the acting user or fails with an authorization error
    pub async fn require_actor(&self) -> Result<ActorId, LedgerError> {
        self.identity.current_actor().await.ok_or_else(|| {
            warn!("ledger write attempted without a resolvable actor");
            LedgerError::authorization("no acting user could be resolved")
        })
    }

    /// Validates and appends an entry, returning it as stored
    pub async fn append(&self, entry: NewEntry) -> Result<LedgerEntry, LedgerError> {
        entry.validate(self.currency)?;
        let actor = self.require_actor().await?;
        let entry = entry.into_entry(LedgerEntryId::new_v7(), Utc::now(), actor);

        self.port.insert_entry(&entry).await?;

        info!(
            entry_id = %entry.id,
            distributor_id = %entry.distributor_id,
            entry_type = %entry.entry_type,
            source_type = %entry.source_type,
            amount = %entry.amount.amount(),
            created_by = %entry.created_by,
            "ledger entry appended"
        );
        Ok(entry)
    }

    pub async fn get(&self, id: LedgerEntryId) -> Result<LedgerEntry, LedgerError> {
        Ok(self.port.get_entry(id).await?)
    }

    /// Current snapshot of a distributor's ledger, newest first
    pub async fn entries(&self, distributor_id: DistributorId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = self.port.list_entries(distributor_id).await?;
        debug!(distributor_id = %distributor_id, count = entries.len(), "ledger snapshot loaded");
        Ok(entries)
    }

    /// Live snapshots of a distributor's ledger
    pub async fn stream(&self, distributor_id: DistributorId) -> Result<LedgerSubscription, LedgerError> {
        if distributor_id.is_nil() {
            return Err(LedgerError::validation("distributor_id is required"));
        }
        Ok(self.port.subscribe(distributor_id).await?)
    }

    /// Rewrites the payment-tracking fields of a debit
    ///
    /// Rejects credits, amounts in another currency, and figures outside
    /// `0 ≤ paid` and `0 ≤ remaining ≤ amount`. `expected_paid` is the
    /// `paid_amount` the update was computed from; if another write got there
    /// first the update fails with [`LedgerError::Conflict`].
    pub async fn update_debit_payment_fields(
        &self,
        id: LedgerEntryId,
        expected_paid: Money,
        update: DebitPaymentUpdate,
    ) -> Result<LedgerEntry, LedgerError> {
        let actor = self.require_actor().await?;
        let debit = self.get(id).await?;
        if !debit.is_debit() {
            return Err(LedgerError::validation(format!("entry {} is not a debit", id)));
        }
        if update.paid_amount.currency() != self.currency
            || update.remaining_amount.currency() != self.currency
        {
            return Err(LedgerError::validation(format!(
                "payment figures must be in {}",
                self.currency
            )));
        }
        if update.paid_amount.is_negative() {
            return Err(LedgerError::validation("paid_amount must not be negative"));
        }
        if update.remaining_amount.is_negative()
            || update.remaining_amount.amount() > debit.amount.amount()
        {
            return Err(LedgerError::validation(format!(
                "remaining_amount must be between 0 and {}",
                debit.amount.amount()
            )));
        }

        let updated = match self.port.update_debit_payment(id, expected_paid, &update).await {
            Ok(updated) => updated,
            Err(e) => {
                let e = LedgerError::from(e);
                if e.is_conflict() {
                    warn!(entry_id = %id, error = %e, "stale debit payment update rejected");
                }
                return Err(e);
            }
        };
        info!(
            entry_id = %id,
            distributor_id = %updated.distributor_id,
            payment_status = %update.payment_status,
            paid_amount = %update.paid_amount.amount(),
            remaining_amount = %update.remaining_amount.amount(),
            updated_by = %actor,
            "debit payment fields updated"
        );
        Ok(updated)
    }

    pub async fn health(&self) -> HealthCheckResult {
        self.port.health_check().await
    }
}
