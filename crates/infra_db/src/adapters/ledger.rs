//! PostgreSQL Ledger Adapter
//!
//! Implements [`LedgerPort`] on top of the [`LedgerRepository`], translating
//! between domain entries and `ledger_entries` rows. Live subscriptions are
//! fed by a LISTEN/NOTIFY task (see [`crate::listener`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{PostgresLedgerAdapter, StreamConfig};
//! use domain_ledger::LedgerPort;
//! use std::sync::Arc;
//!
//! let port: Arc<dyn LedgerPort> = Arc::new(PostgresLedgerAdapter::new(pool, StreamConfig::default()));
//! let entries = port.list_entries(distributor_id).await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::{debug, instrument};

use core_kernel::{
    ActorId, Currency, DistributorId, DomainPort, HealthCheckResult, HealthCheckable,
    LedgerEntryId, Money, PortError, TransferId,
};
use domain_ledger::{
    DebitPaymentUpdate, DebitTracking, EntryType, LedgerEntry, LedgerPort, LedgerSubscription,
    PaymentDetails, PaymentStatus, SourceType,
};

use crate::error::DatabaseError;
use crate::listener::{feed_snapshots, StreamConfig};
use crate::repositories::ledger::{
    EntryType as DbEntryType, LedgerEntryRow, LedgerRepository, PaymentStatus as DbPaymentStatus,
    PaymentTrackingUpdate, SourceType as DbSourceType,
};

/// PostgreSQL-backed implementation of [`LedgerPort`]
///
/// Database errors surface as `PortError`s: duplicates and stale payment
/// updates become `Conflict`, rejected checks become `Validation`, missing
/// rows become `NotFound`.
#[derive(Debug, Clone)]
pub struct PostgresLedgerAdapter {
    repository: LedgerRepository,
    pool: PgPool,
    stream: StreamConfig,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool, stream: StreamConfig) -> Self {
        Self {
            repository: LedgerRepository::new(pool.clone()),
            pool,
            stream,
        }
    }

    pub fn repository(&self) -> &LedgerRepository {
        &self.repository
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Current entries of a distributor, newest first
    pub(crate) async fn snapshot(&self, distributor_id: DistributorId) -> Result<Vec<LedgerEntry>, DatabaseError> {
        self.repository
            .list_by_distributor(distributor_id.into())
            .await?
            .into_iter()
            .map(row_to_entry)
            .collect()
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl HealthCheckable for PostgresLedgerAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let probe = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| PortError::from(DatabaseError::from(e)));
        HealthCheckResult::from_probe("postgres-ledger-adapter", started, probe)
    }
}

#[async_trait]
impl LedgerPort for PostgresLedgerAdapter {
    #[instrument(skip(self, entry), fields(entry_id = %entry.id, distributor_id = %entry.distributor_id))]
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), PortError> {
        debug!("inserting ledger entry");
        let row = entry_to_row(entry)?;
        self.repository.insert(&row).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(entry_id = %id))]
    async fn get_entry(&self, id: LedgerEntryId) -> Result<LedgerEntry, PortError> {
        let row = self.repository.get_by_id(id.into()).await?;
        Ok(row_to_entry(row)?)
    }

    #[instrument(skip(self), fields(distributor_id = %distributor_id))]
    async fn list_entries(&self, distributor_id: DistributorId) -> Result<Vec<LedgerEntry>, PortError> {
        Ok(self.snapshot(distributor_id).await?)
    }

    #[instrument(skip(self, update), fields(entry_id = %id))]
    async fn update_debit_payment(
        &self,
        id: LedgerEntryId,
        expected_paid: Money,
        update: &DebitPaymentUpdate,
    ) -> Result<LedgerEntry, PortError> {
        let row = self
            .repository
            .update_payment_tracking(id.into(), expected_paid.amount(), &update_to_row(update))
            .await?;
        Ok(row_to_entry(row)?)
    }

    #[instrument(skip(self), fields(distributor_id = %distributor_id))]
    async fn subscribe(&self, distributor_id: DistributorId) -> Result<LedgerSubscription, PortError> {
        let initial = self.snapshot(distributor_id).await?;
        let (tx, rx) = watch::channel(Arc::new(initial));
        let feeder = tokio::spawn(feed_snapshots(self.clone(), distributor_id, tx, self.stream));
        Ok(LedgerSubscription::with_feeder(rx, feeder))
    }
}

/// Converts a domain entry into its row
pub fn entry_to_row(entry: &LedgerEntry) -> Result<LedgerEntryRow, DatabaseError> {
    let tracking = entry.tracking.as_ref();
    let payment_details = entry
        .payment_details
        .as_ref()
        .map(|details| serde_json::to_value(details).map(Json))
        .transpose()
        .map_err(|e| DatabaseError::serialization(format!("payment details: {}", e)))?;

    Ok(LedgerEntryRow {
        entry_id: entry.id.into(),
        distributor_id: entry.distributor_id.into(),
        entry_type: domain_to_db_entry_type(entry.entry_type),
        amount: entry.amount.amount(),
        currency: entry.amount.currency().code().to_string(),
        description: entry.description.clone(),
        source_id: entry.source_id,
        source_type: domain_to_db_source_type(entry.source_type),
        created_at: entry.created_at,
        created_by: entry.created_by.as_str().to_string(),
        payment_status: tracking.map(|t| domain_to_db_payment_status(t.payment_status)),
        paid_amount: tracking.map(|t| t.paid_amount.amount()),
        remaining_amount: tracking.map(|t| t.remaining_amount.amount()),
        is_partial_payment: tracking.map(|t| t.is_partial_payment),
        due_date: tracking.and_then(|t| t.due_date),
        related_transfer_id: tracking.and_then(|t| t.related_transfer_id).map(Into::into),
        payment_date: entry.payment_date,
        payment_notes: entry.payment_notes.clone(),
        payment_voucher: entry.payment_voucher.clone(),
        settles_debit_id: entry.settles_debit_id.map(Into::into),
        payment_details,
    })
}

/// Converts a row back into a domain entry
pub fn row_to_entry(row: LedgerEntryRow) -> Result<LedgerEntry, DatabaseError> {
    let currency: Currency = row
        .currency
        .parse()
        .map_err(|e| DatabaseError::serialization(format!("entry {}: {}", row.entry_id, e)))?;
    let created_by = ActorId::new(row.created_by.clone())
        .ok_or_else(|| DatabaseError::serialization(format!("entry {} has no author", row.entry_id)))?;
    let entry_type = db_to_domain_entry_type(row.entry_type);

    let tracking = match entry_type {
        EntryType::Credit => None,
        EntryType::Debit => {
            let missing = || DatabaseError::serialization(format!("debit {} lacks payment tracking", row.entry_id));
            Some(DebitTracking {
                payment_status: row.payment_status.map(db_to_domain_payment_status).ok_or_else(missing)?,
                paid_amount: Money::new(row.paid_amount.ok_or_else(missing)?, currency),
                remaining_amount: Money::new(row.remaining_amount.ok_or_else(missing)?, currency),
                is_partial_payment: row.is_partial_payment.ok_or_else(missing)?,
                due_date: row.due_date,
                related_transfer_id: row.related_transfer_id.map(TransferId::from),
            })
        }
    };

    let payment_details = row
        .payment_details
        .map(|Json(value)| serde_json::from_value::<PaymentDetails>(value))
        .transpose()
        .map_err(|e| DatabaseError::serialization(format!("entry {} payment details: {}", row.entry_id, e)))?;

    Ok(LedgerEntry {
        id: LedgerEntryId::from(row.entry_id),
        distributor_id: DistributorId::from(row.distributor_id),
        entry_type,
        amount: Money::new(row.amount, currency),
        description: row.description,
        source_id: row.source_id,
        source_type: db_to_domain_source_type(row.source_type),
        created_at: row.created_at,
        created_by,
        tracking,
        payment_date: row.payment_date,
        payment_notes: row.payment_notes,
        payment_voucher: row.payment_voucher,
        settles_debit_id: row.settles_debit_id.map(LedgerEntryId::from),
        payment_details,
    })
}

fn update_to_row(update: &DebitPaymentUpdate) -> PaymentTrackingUpdate {
    PaymentTrackingUpdate {
        payment_status: domain_to_db_payment_status(update.payment_status),
        paid_amount: update.paid_amount.amount(),
        remaining_amount: update.remaining_amount.amount(),
        is_partial_payment: update.is_partial_payment,
        payment_date: update.payment_date,
        payment_notes: update.payment_notes.clone(),
    }
}

fn domain_to_db_entry_type(entry_type: EntryType) -> DbEntryType {
    match entry_type {
        EntryType::Debit => DbEntryType::Debit,
        EntryType::Credit => DbEntryType::Credit,
    }
}

fn db_to_domain_entry_type(entry_type: DbEntryType) -> EntryType {
    match entry_type {
        DbEntryType::Debit => EntryType::Debit,
        DbEntryType::Credit => EntryType::Credit,
    }
}

fn domain_to_db_source_type(source_type: SourceType) -> DbSourceType {
    match source_type {
        SourceType::Transfer => DbSourceType::Transfer,
        SourceType::DistributorOrder => DbSourceType::DistributorOrder,
        SourceType::ManualPayment => DbSourceType::ManualPayment,
        SourceType::StockReturn => DbSourceType::StockReturn,
    }
}

fn db_to_domain_source_type(source_type: DbSourceType) -> SourceType {
    match source_type {
        DbSourceType::Transfer => SourceType::Transfer,
        DbSourceType::DistributorOrder => SourceType::DistributorOrder,
        DbSourceType::ManualPayment => SourceType::ManualPayment,
        DbSourceType::StockReturn => SourceType::StockReturn,
    }
}

fn domain_to_db_payment_status(status: PaymentStatus) -> DbPaymentStatus {
    match status {
        PaymentStatus::Pending => DbPaymentStatus::Pending,
        PaymentStatus::Partial => DbPaymentStatus::Partial,
        PaymentStatus::Paid => DbPaymentStatus::Paid,
    }
}

fn db_to_domain_payment_status(status: DbPaymentStatus) -> PaymentStatus {
    match status {
        DbPaymentStatus::Pending => PaymentStatus::Pending,
        DbPaymentStatus::Partial => PaymentStatus::Partial,
        DbPaymentStatus::Paid => PaymentStatus::Paid,
    }
}
