//! Enhanced ledger summary
//!
//! A pure fold over one distributor's entries. Every debit is read through
//! its return-adjusted view, and monetary totals are rounded once at the end.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{round_money, Currency, Money};

use crate::entry::{LedgerEntry, PaymentStatus};
use crate::matcher::ReturnMatcher;

/// Financial picture of one distributor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedLedgerSummary {
    pub total_debit: Money,
    pub total_credit: Money,
    /// `total_debit − total_credit`
    pub balance: Money,
    /// Return-adjusted balance still owed across all debits
    pub pending_amount: Money,
    /// Return-adjusted amount settled across all debits
    pub paid_amount: Money,
    pub overdue_amount: Money,
    /// Debits partially settled
    pub partial_payments: u32,
    pub total_transactions: u32,
    /// Mean age in whole days of debits still owing, one decimal
    pub average_debt_age: Decimal,
    pub oldest_unpaid_date: Option<DateTime<Utc>>,
    pub last_payment_date: Option<DateTime<Utc>>,
}

/// Folds ledger entries into an [`EnhancedLedgerSummary`]
#[derive(Debug, Clone)]
pub struct SummaryAggregator {
    matcher: ReturnMatcher,
    currency: Currency,
}

impl SummaryAggregator {
    pub fn new(matcher: ReturnMatcher, currency: Currency) -> Self {
        Self { matcher, currency }
    }

    /// Summarises `entries` as of `now`
    ///
    /// Entries repeated in the input (same id) are counted once.
    pub fn summarize(&self, entries: &[LedgerEntry], now: DateTime<Utc>) -> EnhancedLedgerSummary {
        let mut seen = HashSet::new();
        let entries: Vec<LedgerEntry> = entries
            .iter()
            .filter(|e| seen.insert(e.id))
            .cloned()
            .collect();

        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        let mut pending = Decimal::ZERO;
        let mut paid = Decimal::ZERO;
        let mut overdue = Decimal::ZERO;
        let mut partial_payments = 0u32;
        let mut age_days_total = 0i64;
        let mut owing_debits = 0i64;
        let mut oldest_unpaid: Option<DateTime<Utc>> = None;
        let mut last_payment: Option<DateTime<Utc>> = None;

        for entry in &entries {
            if entry.is_credit() {
                total_credit += entry.amount.amount();
                if !self.matcher.is_return_candidate(entry) {
                    let date = entry.effective_date();
                    last_payment = Some(last_payment.map_or(date, |d| d.max(date)));
                }
                continue;
            }

            total_debit += entry.amount.amount();
            let view = self.matcher.assess(entry, &entries);
            let remaining = view.exact_remaining();
            pending += remaining;
            paid += entry.amount.amount() - remaining;

            if view.payment_status == PaymentStatus::Partial {
                partial_payments += 1;
            }
            if remaining > Decimal::ZERO {
                if entry.due_date().map_or(false, |due| due < now) {
                    overdue += remaining;
                }
                age_days_total += (now - entry.created_at).num_days().max(0);
                owing_debits += 1;
                oldest_unpaid = Some(oldest_unpaid.map_or(entry.created_at, |d| d.min(entry.created_at)));
            }
        }

        let money = |value: Decimal| Money::new(value, self.currency).round_to_currency();
        let mut average_debt_age = if owing_debits > 0 {
            round_money(Decimal::from(age_days_total) / Decimal::from(owing_debits), 1)
        } else {
            Decimal::ZERO
        };
        average_debt_age.rescale(1);

        EnhancedLedgerSummary {
            total_debit: money(total_debit),
            total_credit: money(total_credit),
            balance: money(total_debit - total_credit),
            pending_amount: money(pending),
            paid_amount: money(paid),
            overdue_amount: money(overdue),
            partial_payments,
            total_transactions: u32::try_from(entries.len()).unwrap_or(u32::MAX),
            average_debt_age,
            oldest_unpaid_date: oldest_unpaid,
            last_payment_date: last_payment,
        }
    }
}
