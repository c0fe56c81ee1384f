//! Ledger entries
//!
//! A distributor's ledger holds two kinds of entry. A debit is debt the
//! distributor owes, booked when stock is transferred or an order is placed.
//! A credit reduces that debt, either as a manual payment or as the credit
//! issued when stock comes back.
//!
//! Entries are append-only. The only fields that ever change after creation
//! are the payment-tracking fields on a debit ([`DebitTracking`]), and only
//! through [`DebitPaymentUpdate`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{ActorId, Currency, DistributorId, LedgerEntryId, Money, TransferId};

use crate::error::LedgerError;

/// Debit or credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Debt owed by the distributor
    Debit,
    /// Payment or return credit
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Debit => "debit",
            EntryType::Credit => "credit",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(EntryType::Debit),
            "credit" => Ok(EntryType::Credit),
            other => Err(LedgerError::validation(format!("unknown entry type '{}'", other))),
        }
    }
}

/// The workflow that produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Stock transfer to the distributor
    Transfer,
    /// Order placed by the distributor
    DistributorOrder,
    /// Payment recorded by an administrator
    ManualPayment,
    /// Credit issued for stock returned to the main warehouse
    StockReturn,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Transfer => "transfer",
            SourceType::DistributorOrder => "distributor_order",
            SourceType::ManualPayment => "manual_payment",
            SourceType::StockReturn => "stock_return",
        }
    }

    /// Source types a debit may be booked under
    pub fn is_debt_source(&self) -> bool {
        matches!(self, SourceType::Transfer | SourceType::DistributorOrder)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(SourceType::Transfer),
            "distributor_order" => Ok(SourceType::DistributorOrder),
            "manual_payment" => Ok(SourceType::ManualPayment),
            "stock_return" => Ok(SourceType::StockReturn),
            other => Err(LedgerError::validation(format!("unknown source type '{}'", other))),
        }
    }
}

/// Payment progress of a debit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(LedgerError::validation(format!("unknown payment status '{}'", other))),
        }
    }
}

/// How a manual payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Deposit,
    Check,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Deposit => "deposit",
            PaymentMethod::Check => "check",
            PaymentMethod::Card => "card",
            PaymentMethod::Other => "other",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "deposit" => Ok(PaymentMethod::Deposit),
            "check" => Ok(PaymentMethod::Check),
            "card" => Ok(PaymentMethod::Card),
            "other" => Ok(PaymentMethod::Other),
            other => Err(LedgerError::validation(format!("unknown payment method '{}'", other))),
        }
    }
}

/// Supplementary record attached to a payment credit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub payment_method: PaymentMethod,
    pub bank_reference: Option<String>,
    pub notes: Option<String>,
    pub paid_date: DateTime<Utc>,
    /// Debit this payment settles
    pub parent_debit_id: Option<LedgerEntryId>,
    /// Link to a scanned receipt or transfer voucher
    pub voucher: Option<String>,
}

impl PaymentDetails {
    pub fn new(payment_method: PaymentMethod, paid_date: DateTime<Utc>) -> Self {
        Self {
            payment_method,
            bank_reference: None,
            notes: None,
            paid_date,
            parent_debit_id: None,
            voucher: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.bank_reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_voucher(mut self, voucher: impl Into<String>) -> Self {
        self.voucher = Some(voucher.into());
        self
    }

    pub fn for_debit(mut self, debit_id: LedgerEntryId) -> Self {
        self.parent_debit_id = Some(debit_id);
        self
    }
}

/// Payment-tracking fields carried by every debit
///
/// `paid_amount` counts manual payments only. Matched return credits are
/// folded in at read time by the return matcher, so `remaining_amount` here
/// is the manual-only figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebitTracking {
    pub payment_status: PaymentStatus,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub is_partial_payment: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub related_transfer_id: Option<TransferId>,
}

impl DebitTracking {
    /// Tracking for a freshly booked, unpaid debit
    pub fn unpaid(amount: Money) -> Self {
        Self {
            payment_status: PaymentStatus::Pending,
            paid_amount: Money::zero(amount.currency()),
            remaining_amount: amount,
            is_partial_payment: false,
            due_date: None,
            related_transfer_id: None,
        }
    }
}

/// The payment-tracking fields that may be rewritten on a debit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebitPaymentUpdate {
    pub payment_status: PaymentStatus,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub is_partial_payment: bool,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_notes: Option<String>,
}

/// A ledger entry as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub distributor_id: DistributorId,
    pub entry_type: EntryType,
    pub amount: Money,
    pub description: String,
    pub source_id: Uuid,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
    pub created_by: ActorId,
    /// Present on debits only
    pub tracking: Option<DebitTracking>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_notes: Option<String>,
    pub payment_voucher: Option<String>,
    /// Debit a credit was written against, when the writer knew it
    pub settles_debit_id: Option<LedgerEntryId>,
    pub payment_details: Option<PaymentDetails>,
}

impl LedgerEntry {
    pub fn is_debit(&self) -> bool {
        self.entry_type == EntryType::Debit
    }

    pub fn is_credit(&self) -> bool {
        self.entry_type == EntryType::Credit
    }

    /// Manual payments recorded against this debit (zero for credits)
    pub fn manual_paid(&self) -> Money {
        self.tracking
            .as_ref()
            .map(|t| t.paid_amount)
            .unwrap_or_else(|| Money::zero(self.amount.currency()))
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.tracking.as_ref().and_then(|t| t.due_date)
    }

    /// When the money moved: the payment date if recorded, else creation time
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.payment_date.unwrap_or(self.created_at)
    }

    /// Applies a payment-tracking update; credits have no tracking to update
    pub fn apply_payment_update(&mut self, update: &DebitPaymentUpdate) -> Result<(), LedgerError> {
        let tracking = self.tracking.as_mut().ok_or_else(|| {
            LedgerError::validation(format!("entry {} is not a debit", self.id))
        })?;
        tracking.payment_status = update.payment_status;
        tracking.paid_amount = update.paid_amount;
        tracking.remaining_amount = update.remaining_amount;
        tracking.is_partial_payment = update.is_partial_payment;
        if update.payment_date.is_some() {
            self.payment_date = update.payment_date;
        }
        if update.payment_notes.is_some() {
            self.payment_notes = update.payment_notes.clone();
        }
        Ok(())
    }
}

/// Sorts newest first; ties fall back to the (time-ordered) id
pub fn sort_newest_first(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

/// An entry that has not been written yet
///
/// Identity, creation time and author are assigned by the store on append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub distributor_id: DistributorId,
    pub entry_type: EntryType,
    pub amount: Money,
    pub description: String,
    pub source_id: Uuid,
    pub source_type: SourceType,
    pub due_date: Option<DateTime<Utc>>,
    pub related_transfer_id: Option<TransferId>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_notes: Option<String>,
    pub payment_voucher: Option<String>,
    pub settles_debit_id: Option<LedgerEntryId>,
    pub payment_details: Option<PaymentDetails>,
}

impl NewEntry {
    fn base(
        distributor_id: DistributorId,
        entry_type: EntryType,
        amount: Money,
        description: impl Into<String>,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Self {
        Self {
            distributor_id,
            entry_type,
            amount,
            description: description.into(),
            source_id,
            source_type,
            due_date: None,
            related_transfer_id: None,
            payment_date: None,
            payment_notes: None,
            payment_voucher: None,
            settles_debit_id: None,
            payment_details: None,
        }
    }

    pub fn debit(
        distributor_id: DistributorId,
        amount: Money,
        description: impl Into<String>,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Self {
        Self::base(distributor_id, EntryType::Debit, amount, description, source_type, source_id)
    }

    pub fn credit(
        distributor_id: DistributorId,
        amount: Money,
        description: impl Into<String>,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Self {
        Self::base(distributor_id, EntryType::Credit, amount, description, source_type, source_id)
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn related_transfer(mut self, transfer_id: TransferId) -> Self {
        self.related_transfer_id = Some(transfer_id);
        self
    }

    pub fn paid_on(mut self, payment_date: DateTime<Utc>) -> Self {
        self.payment_date = Some(payment_date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.payment_notes = Some(notes.into());
        self
    }

    pub fn settles(mut self, debit_id: LedgerEntryId) -> Self {
        self.settles_debit_id = Some(debit_id);
        self
    }

    /// Attaches payment details, copying date, notes and voucher onto the entry
    pub fn with_payment_details(mut self, details: PaymentDetails) -> Self {
        self.payment_date = Some(details.paid_date);
        if details.notes.is_some() {
            self.payment_notes = details.notes.clone();
        }
        if details.voucher.is_some() {
            self.payment_voucher = details.voucher.clone();
        }
        if self.settles_debit_id.is_none() {
            self.settles_debit_id = details.parent_debit_id;
        }
        self.payment_details = Some(details);
        self
    }

    /// Checks the append preconditions against the ledger currency
    pub fn validate(&self, currency: Currency) -> Result<(), LedgerError> {
        if self.distributor_id.is_nil() {
            return Err(LedgerError::validation("distributor_id is required"));
        }
        if self.amount.currency() != currency {
            return Err(LedgerError::validation(format!(
                "amount must be in {}, got {}",
                currency,
                self.amount.currency()
            )));
        }
        if !self.amount.round_to_currency().is_positive() {
            return Err(LedgerError::validation(format!(
                "amount must be greater than zero, got {}",
                self.amount.amount()
            )));
        }
        if self.description.trim().is_empty() {
            return Err(LedgerError::validation("description is required"));
        }
        match self.entry_type {
            EntryType::Debit if !self.source_type.is_debt_source() => {
                Err(LedgerError::validation(format!(
                    "a debit cannot originate from {}",
                    self.source_type
                )))
            }
            EntryType::Debit if self.settles_debit_id.is_some() => {
                Err(LedgerError::validation("only credits may settle a debit"))
            }
            _ => Ok(()),
        }
    }

    /// Materialises the entry; the amount is rounded to the currency here
    pub fn into_entry(
        self,
        id: LedgerEntryId,
        created_at: DateTime<Utc>,
        created_by: ActorId,
    ) -> LedgerEntry {
        let amount = self.amount.round_to_currency();
        let tracking = match self.entry_type {
            EntryType::Debit => Some(DebitTracking {
                due_date: self.due_date,
                related_transfer_id: self.related_transfer_id,
                ..DebitTracking::unpaid(amount)
            }),
            EntryType::Credit => None,
        };
        LedgerEntry {
            id,
            distributor_id: self.distributor_id,
            entry_type: self.entry_type,
            amount,
            description: self.description.trim().to_string(),
            source_id: self.source_id,
            source_type: self.source_type,
            created_at,
            created_by,
            tracking,
            payment_date: self.payment_date,
            payment_notes: self.payment_notes,
            payment_voucher: self.payment_voucher,
            settles_debit_id: self.settles_debit_id,
            payment_details: self.payment_details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn actor() -> ActorId {
        ActorId::new("admin").unwrap()
    }

    #[test]
    fn test_debit_gets_unpaid_tracking() {
        let entry = NewEntry::debit(
            DistributorId::new(),
            usd(dec!(100.004)),
            "Transferencia de 1 x Gorra (Azul)",
            SourceType::Transfer,
            Uuid::new_v4(),
        )
        .into_entry(LedgerEntryId::new_v7(), Utc::now(), actor());

        assert_eq!(entry.amount.amount(), dec!(100.00));
        let tracking = entry.tracking.as_ref().unwrap();
        assert_eq!(tracking.payment_status, PaymentStatus::Pending);
        assert!(tracking.paid_amount.is_zero());
        assert_eq!(tracking.remaining_amount.amount(), dec!(100.00));
    }

    #[test]
    fn test_credit_has_no_tracking() {
        let entry = NewEntry::credit(
            DistributorId::new(),
            usd(dec!(10)),
            "Pago: abono",
            SourceType::ManualPayment,
            Uuid::new_v4(),
        )
        .into_entry(LedgerEntryId::new_v7(), Utc::now(), actor());
        assert!(entry.tracking.is_none());
        assert!(entry.manual_paid().is_zero());
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        let entry = NewEntry::debit(
            DistributorId::new(),
            usd(dec!(0.004)),
            "x",
            SourceType::Transfer,
            Uuid::new_v4(),
        );
        assert!(matches!(entry.validate(Currency::USD), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_nil_distributor_and_wrong_currency() {
        let nil = NewEntry::debit(
            DistributorId::from_uuid(Uuid::nil()),
            usd(dec!(5)),
            "x",
            SourceType::Transfer,
            Uuid::new_v4(),
        );
        assert!(nil.validate(Currency::USD).is_err());

        let eur = NewEntry::debit(
            DistributorId::new(),
            Money::new(dec!(5), Currency::EUR),
            "x",
            SourceType::Transfer,
            Uuid::new_v4(),
        );
        assert!(eur.validate(Currency::USD).is_err());
    }

    #[test]
    fn test_validate_rejects_debit_from_payment_source() {
        let entry = NewEntry::debit(
            DistributorId::new(),
            usd(dec!(5)),
            "x",
            SourceType::ManualPayment,
            Uuid::new_v4(),
        );
        assert!(entry.validate(Currency::USD).is_err());
    }

    #[test]
    fn test_payment_details_populate_entry() {
        let debit_id = LedgerEntryId::new_v7();
        let paid = Utc::now() - Duration::days(1);
        let details = PaymentDetails::new(PaymentMethod::BankTransfer, paid)
            .with_reference("REF-1")
            .with_notes("abono")
            .with_voucher("https://vouchers/1.png")
            .for_debit(debit_id);

        let entry = NewEntry::credit(
            DistributorId::new(),
            usd(dec!(10)),
            "Pago: x",
            SourceType::ManualPayment,
            Uuid::new_v4(),
        )
        .with_payment_details(details);

        assert_eq!(entry.payment_date, Some(paid));
        assert_eq!(entry.payment_notes.as_deref(), Some("abono"));
        assert_eq!(entry.payment_voucher.as_deref(), Some("https://vouchers/1.png"));
        assert_eq!(entry.settles_debit_id, Some(debit_id));
    }

    #[test]
    fn test_apply_payment_update_rejects_credit() {
        let mut credit = NewEntry::credit(
            DistributorId::new(),
            usd(dec!(10)),
            "Pago",
            SourceType::ManualPayment,
            Uuid::new_v4(),
        )
        .into_entry(LedgerEntryId::new_v7(), Utc::now(), actor());

        let update = DebitPaymentUpdate {
            payment_status: PaymentStatus::Paid,
            paid_amount: usd(dec!(10)),
            remaining_amount: usd(dec!(0)),
            is_partial_payment: false,
            payment_date: None,
            payment_notes: None,
        };
        assert!(credit.apply_payment_update(&update).is_err());
    }

    #[test]
    fn test_sort_newest_first() {
        let now = Utc::now();
        let make = |offset: i64| {
            NewEntry::debit(
                DistributorId::new(),
                usd(dec!(1)),
                "x",
                SourceType::Transfer,
                Uuid::new_v4(),
            )
            .into_entry(LedgerEntryId::new_v7(), now - Duration::minutes(offset), actor())
        };
        let mut entries = vec![make(5), make(0), make(10)];
        sort_newest_first(&mut entries);
        assert!(entries[0].created_at > entries[1].created_at);
        assert!(entries[1].created_at > entries[2].created_at);
    }

    #[test]
    fn test_enum_string_round_trip() {
        assert_eq!("stock_return".parse::<SourceType>().unwrap(), SourceType::StockReturn);
        assert_eq!(SourceType::DistributorOrder.to_string(), "distributor_order");
        assert!("refund".parse::<SourceType>().is_err());
        assert_eq!("partial".parse::<PaymentStatus>().unwrap(), PaymentStatus::Partial);
    }
}
