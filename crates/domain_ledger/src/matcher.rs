//! Return matching and the return-adjusted view of a debit
//!
//! A credit counts against a debit when it is a return candidate and either
//! names the debit through `settles_debit_id` or, for unlinked legacy
//! credits, describes the same product and variant.
//!
//! `remaining = max(0, amount − manual payments − matched returns)`

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{LedgerEntryId, Money};

use crate::config::LedgerConfig;
use crate::description::DescriptionCodec;
use crate::entry::{LedgerEntry, PaymentStatus, SourceType};
use crate::payment::PaymentStateMachine;

/// Quantity-based return progress; informational only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStatus {
    pub transferred_quantity: u32,
    pub returned_quantity: u32,
    pub is_complete_return: bool,
    pub is_partial_return: bool,
    pub matched_credit_ids: Vec<LedgerEntryId>,
}

/// A debit with manual payments and matched returns folded in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebitView {
    pub debit: LedgerEntry,
    /// Manual payments as stored on the debit
    pub manual_paid: Money,
    /// Sum of matched return credits
    pub automatic_returns: Money,
    /// Return-adjusted balance, rounded
    pub remaining_amount: Money,
    /// `amount − remaining_amount`
    pub paid_amount: Money,
    pub payment_status: PaymentStatus,
    pub returns: ReturnStatus,
    #[serde(skip)]
    exact_remaining: Decimal,
}

impl DebitView {
    /// Unrounded return-adjusted balance, for folds that round once at the end
    pub fn exact_remaining(&self) -> Decimal {
        self.exact_remaining
    }

    pub fn is_settled(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Not paid and past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_settled() && self.debit.due_date().map_or(false, |due| due < now)
    }
}

/// Associates return credits with the debits they offset
#[derive(Debug, Clone)]
pub struct ReturnMatcher {
    marker: String,
}

impl ReturnMatcher {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().trim().to_lowercase(),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(&config.return_marker)
    }

    /// Stock-return credits, plus legacy credits carrying the return marker
    ///
    /// Manual payments are never candidates; they are already in `paid_amount`.
    pub fn is_return_candidate(&self, entry: &LedgerEntry) -> bool {
        if !entry.is_credit() {
            return false;
        }
        match entry.source_type {
            SourceType::StockReturn => true,
            SourceType::ManualPayment => false,
            _ => DescriptionCodec::mentions(&entry.description, &self.marker),
        }
    }

    /// Return credits that offset `debit`, each counted once
    pub fn matching_returns<'a>(
        &self,
        debit: &LedgerEntry,
        entries: &'a [LedgerEntry],
    ) -> Vec<&'a LedgerEntry> {
        let key = DescriptionCodec::extract_item(&debit.description);
        let mut matched: BTreeMap<LedgerEntryId, &'a LedgerEntry> = BTreeMap::new();
        for entry in entries {
            if entry.distributor_id != debit.distributor_id || !self.is_return_candidate(entry) {
                continue;
            }
            let is_match = match entry.settles_debit_id {
                Some(linked) => linked == debit.id,
                None => DescriptionCodec::extract_item(&entry.description) == key,
            };
            if is_match {
                matched.entry(entry.id).or_insert(entry);
            }
        }
        matched.into_values().collect()
    }

    /// Builds the return-adjusted view of a debit
    pub fn assess(&self, debit: &LedgerEntry, entries: &[LedgerEntry]) -> DebitView {
        let currency = debit.amount.currency();
        let returns = self.matching_returns(debit, entries);

        let automatic_returns: Decimal = returns.iter().map(|e| e.amount.amount()).sum();
        let manual_paid = debit.manual_paid().amount();
        let exact_remaining = (debit.amount.amount() - manual_paid - automatic_returns)
            .max(Decimal::ZERO)
            .min(debit.amount.amount());
        let remaining = Money::new(exact_remaining, currency).round_to_currency();
        let paid = Money::new(debit.amount.amount() - remaining.amount(), currency);

        let transferred_quantity = DescriptionCodec::extract_quantity(&debit.description);
        let returned_quantity = returns
            .iter()
            .map(|e| DescriptionCodec::extract_quantity(&e.description))
            .fold(0u32, |acc, q| acc.saturating_add(q));

        DebitView {
            manual_paid: Money::new(manual_paid, currency),
            automatic_returns: Money::new(automatic_returns, currency),
            remaining_amount: remaining,
            paid_amount: paid,
            payment_status: PaymentStateMachine::derive_status(
                debit.amount.amount(),
                remaining.amount(),
                manual_paid + automatic_returns,
            ),
            returns: ReturnStatus {
                transferred_quantity,
                returned_quantity,
                is_complete_return: !returns.is_empty() && returned_quantity >= transferred_quantity,
                is_partial_return: returned_quantity > 0 && returned_quantity < transferred_quantity,
                matched_credit_ids: returns.iter().map(|e| e.id).collect(),
            },
            debit: debit.clone(),
            exact_remaining,
        }
    }

    /// Views for every debit in `entries`, in input order
    pub fn assess_all(&self, entries: &[LedgerEntry]) -> Vec<DebitView> {
        entries
            .iter()
            .filter(|e| e.is_debit())
            .map(|debit| self.assess(debit, entries))
            .collect()
    }
}
