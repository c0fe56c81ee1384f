//! Ledger DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use core_kernel::{DistributorId, LedgerEntryId, ProductId, TransferId, VariantId};
use domain_ledger::{
    DebitView, EnhancedLedgerSummary, LedgerEntry, LineItem, PaymentDetails, PaymentMethod,
    RegisterDebit, RegisterPayment, RevertOutcome, RevertRequest, SourceType,
};

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("positive").with_message("must be greater than zero".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDebitRequest {
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    #[validate(length(min = 1, message = "description cannot be empty"))]
    pub description: String,
    #[serde(default = "default_debit_source")]
    pub source_type: SourceType,
    pub source_id: Uuid,
    pub due_date: Option<DateTime<Utc>>,
    pub related_transfer_id: Option<Uuid>,
}

fn default_debit_source() -> SourceType {
    SourceType::Transfer
}

impl RegisterDebitRequest {
    pub fn into_command(self, distributor_id: DistributorId) -> RegisterDebit {
        RegisterDebit {
            distributor_id,
            amount: self.amount,
            description: self.description,
            source_type: self.source_type,
            source_id: self.source_id,
            due_date: self.due_date,
            related_transfer_id: self.related_transfer_id.map(TransferId::from),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterPaymentRequest {
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    /// Defaults to "Pago: {method}" when empty
    #[serde(default)]
    pub description: String,
    pub payment_method: PaymentMethod,
    pub bank_reference: Option<String>,
    pub notes: Option<String>,
    pub paid_date: Option<DateTime<Utc>>,
    /// Debit this payment settles, if any
    pub parent_debit_id: Option<Uuid>,
    #[validate(url(message = "voucher must be a URL"))]
    pub voucher: Option<String>,
}

impl RegisterPaymentRequest {
    pub fn into_command(self, distributor_id: DistributorId) -> RegisterPayment {
        let mut details = PaymentDetails::new(self.payment_method, self.paid_date.unwrap_or_else(Utc::now));
        details.bank_reference = self.bank_reference;
        details.notes = self.notes;
        details.voucher = self.voucher;
        details.parent_debit_id = self.parent_debit_id.map(LedgerEntryId::from);
        RegisterPayment {
            distributor_id,
            amount: self.amount,
            description: self.description,
            details,
        }
    }
}

/// Payment against the debit named in the path
#[derive(Debug, Deserialize, Validate)]
pub struct PayDebitRequest {
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub bank_reference: Option<String>,
    pub notes: Option<String>,
    pub paid_date: Option<DateTime<Utc>>,
    #[validate(url(message = "voucher must be a URL"))]
    pub voucher: Option<String>,
}

impl PayDebitRequest {
    pub fn into_command(self, distributor_id: DistributorId, debit_id: LedgerEntryId) -> RegisterPayment {
        RegisterPaymentRequest {
            amount: self.amount,
            description: String::new(),
            payment_method: self.payment_method,
            bank_reference: self.bank_reference,
            notes: self.notes,
            paid_date: self.paid_date,
            parent_debit_id: Some(debit_id.into()),
            voucher: self.voucher,
        }
        .into_command(distributor_id)
    }
}

/// Line item and quantity to revert
#[derive(Debug, Deserialize, Validate)]
pub struct RevertItemRequest {
    pub product_id: Uuid,
    pub variant_id: Uuid,
    #[validate(length(min = 1, message = "product name cannot be empty"))]
    pub product_name: String,
    #[serde(default)]
    pub variant_name: String,
    /// Price known to the caller, used only when the catalog is unavailable
    pub base_price: Option<Decimal>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    pub notes: Option<String>,
}

impl RevertItemRequest {
    pub fn line_item(&self) -> LineItem {
        let item = LineItem::new(
            ProductId::from(self.product_id),
            VariantId::from(self.variant_id),
            self.product_name.clone(),
            self.variant_name.clone(),
        );
        match self.base_price {
            Some(price) => item.with_base_price(price),
            None => item,
        }
    }

    pub fn into_command(self, distributor_id: DistributorId) -> RevertRequest {
        RevertRequest {
            distributor_id,
            item: self.line_item(),
            quantity: self.quantity,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LedgerEntriesResponse {
    pub distributor_id: DistributorId,
    pub total: usize,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub distributor_id: DistributorId,
    pub summary: EnhancedLedgerSummary,
    /// Return-adjusted view of every debit, newest first
    pub debits: Vec<DebitView>,
}

/// Revert result; `status` is `completed` or `degraded`
#[derive(Debug, Serialize)]
pub struct RevertResponse {
    #[serde(flatten)]
    pub outcome: RevertOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<RevertOutcome> for RevertResponse {
    fn from(outcome: RevertOutcome) -> Self {
        Self {
            warning: outcome.warning(),
            outcome,
        }
    }
}
