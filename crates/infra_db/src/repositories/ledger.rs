//! Ledger repository implementation
//!
//! Database access for the `ledger_entries` table. Rows are append-only;
//! the single update path touches the payment-tracking columns of a debit,
//! and a guard trigger rejects anything else.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const ENTRY_COLUMNS: &str = r#"
    entry_id, distributor_id, entry_type, amount, currency, description,
    source_id, source_type, created_at, created_by,
    payment_status, paid_amount, remaining_amount, is_partial_payment,
    due_date, related_transfer_id, payment_date, payment_notes, payment_voucher,
    settles_debit_id, payment_details
"#;

/// Repository for ledger entries
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts one entry
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` when the id already exists, `ConstraintViolation`
    /// when the row breaks a table check.
    pub async fn insert(&self, row: &LedgerEntryRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                entry_id, distributor_id, entry_type, amount, currency, description,
                source_id, source_type, created_at, created_by,
                payment_status, paid_amount, remaining_amount, is_partial_payment,
                due_date, related_transfer_id, payment_date, payment_notes, payment_voucher,
                settles_debit_id, payment_details
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            )
            "#,
        )
        .bind(row.entry_id)
        .bind(row.distributor_id)
        .bind(row.entry_type)
        .bind(row.amount)
        .bind(&row.currency)
        .bind(&row.description)
        .bind(row.source_id)
        .bind(row.source_type)
        .bind(row.created_at)
        .bind(&row.created_by)
        .bind(row.payment_status)
        .bind(row.paid_amount)
        .bind(row.remaining_amount)
        .bind(row.is_partial_payment)
        .bind(row.due_date)
        .bind(row.related_transfer_id)
        .bind(row.payment_date)
        .bind(&row.payment_notes)
        .bind(&row.payment_voucher)
        .bind(row.settles_debit_id)
        .bind(&row.payment_details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieves an entry by id
    pub async fn get_by_id(&self, entry_id: Uuid) -> Result<LedgerEntryRow, DatabaseError> {
        let query = format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE entry_id = $1");
        sqlx::query_as::<_, LedgerEntryRow>(&query)
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("LedgerEntry", entry_id))
    }

    /// All entries of a distributor, newest first
    pub async fn list_by_distributor(&self, distributor_id: Uuid) -> Result<Vec<LedgerEntryRow>, DatabaseError> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries \
             WHERE distributor_id = $1 \
             ORDER BY created_at DESC, entry_id DESC"
        );
        let rows = sqlx::query_as::<_, LedgerEntryRow>(&query)
            .bind(distributor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Rewrites the payment-tracking columns of a debit
    ///
    /// `payment_date` and `payment_notes` are kept when the update leaves
    /// them empty. The row is only touched while `paid_amount` still equals
    /// `expected_paid`.
    ///
    /// # Errors
    ///
    /// `StaleWrite` when the debit exists but its `paid_amount` moved,
    /// `NotFound` when there is no such debit.
    pub async fn update_payment_tracking(
        &self,
        entry_id: Uuid,
        expected_paid: Decimal,
        update: &PaymentTrackingUpdate,
    ) -> Result<LedgerEntryRow, DatabaseError> {
        let query = format!(
            r#"
            UPDATE ledger_entries SET
                payment_status = $2,
                paid_amount = $3,
                remaining_amount = $4,
                is_partial_payment = $5,
                payment_date = COALESCE($6, payment_date),
                payment_notes = COALESCE($7, payment_notes)
            WHERE entry_id = $1 AND entry_type = 'debit' AND paid_amount = $8
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, LedgerEntryRow>(&query)
            .bind(entry_id)
            .bind(update.payment_status)
            .bind(update.paid_amount)
            .bind(update.remaining_amount)
            .bind(update.is_partial_payment)
            .bind(update.payment_date)
            .bind(&update.payment_notes)
            .bind(expected_paid)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = updated {
            return Ok(row);
        }

        match self.get_by_id(entry_id).await {
            Ok(current) if current.entry_type == EntryType::Debit => Err(DatabaseError::StaleWrite(format!(
                "debit {} paid_amount is {}, expected {}",
                entry_id,
                current.paid_amount.unwrap_or_default(),
                expected_paid
            ))),
            Ok(_) => Err(DatabaseError::not_found("Debit", entry_id)),
            Err(e) if e.is_not_found() => Err(DatabaseError::not_found("Debit", entry_id)),
            Err(e) => Err(e),
        }
    }
}

/// A row of `ledger_entries`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LedgerEntryRow {
    pub entry_id: Uuid,
    pub distributor_id: Uuid,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub source_id: Uuid,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub payment_status: Option<PaymentStatus>,
    pub paid_amount: Option<Decimal>,
    pub remaining_amount: Option<Decimal>,
    pub is_partial_payment: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub related_transfer_id: Option<Uuid>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_notes: Option<String>,
    pub payment_voucher: Option<String>,
    pub settles_debit_id: Option<Uuid>,
    pub payment_details: Option<Json<serde_json::Value>>,
}

/// New values for the payment-tracking columns
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentTrackingUpdate {
    pub payment_status: PaymentStatus,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub is_partial_payment: bool,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "snake_case")]
pub enum EntryType {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ledger_source_type", rename_all = "snake_case")]
pub enum SourceType {
    Transfer,
    DistributorOrder,
    ManualPayment,
    StockReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ledger_payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}
