//! Payment state machine
//!
//! ```text
//! pending ──► partial ──► paid
//!    └────────────────────▲
//! ```
//!
//! Manual progress is monotonic. A debit can also reach `paid` in one step,
//! through a single full payment or a full matched return. `overdue` is a
//! view (`status != paid && due_date < now`), never a stored state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use core_kernel::{LedgerEntryId, Money};

use crate::description::DescriptionCodec;
use crate::entry::{
    DebitPaymentUpdate, LedgerEntry, NewEntry, PaymentDetails, PaymentStatus, SourceType,
};
use crate::error::LedgerError;
use crate::matcher::{DebitView, ReturnMatcher};
use crate::store::LedgerStore;

/// Result of a manual payment against a debit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// The debit with its updated payment-tracking fields
    pub debit: LedgerEntry,
    /// The manual-payment credit that was appended
    pub credit: LedgerEntry,
    /// Return-adjusted view after the payment
    pub view: DebitView,
}

/// Drives debits through their payment states
#[derive(Clone)]
pub struct PaymentStateMachine {
    store: LedgerStore,
    matcher: ReturnMatcher,
}

impl PaymentStateMachine {
    pub fn new(store: LedgerStore, matcher: ReturnMatcher) -> Self {
        Self { store, matcher }
    }

    /// Status for a debit given its balance and everything settled so far
    pub fn derive_status(amount: Decimal, remaining: Decimal, settled: Decimal) -> PaymentStatus {
        if remaining <= Decimal::ZERO {
            PaymentStatus::Paid
        } else if settled > Decimal::ZERO && remaining < amount {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }

    /// Computes the stored (manual-only) fields after a payment
    ///
    /// `view` supplies the return-adjusted remaining amount the payment is
    /// validated against; the stored figures themselves ignore returns.
    pub fn transition(
        view: &DebitView,
        payment: Money,
        details: &PaymentDetails,
    ) -> Result<DebitPaymentUpdate, LedgerError> {
        let debit = &view.debit;
        if !debit.is_debit() {
            return Err(LedgerError::validation(format!("entry {} is not a debit", debit.id)));
        }
        let payment = payment.round_to_currency();
        if !payment.is_positive() {
            return Err(LedgerError::validation("payment amount must be greater than zero"));
        }
        if payment.amount() > view.remaining_amount.amount() {
            return Err(LedgerError::validation(format!(
                "payment of {} exceeds remaining balance of {}",
                payment.amount(),
                view.remaining_amount.amount()
            )));
        }

        let new_paid = debit.manual_paid().checked_add(&payment)?;
        let new_remaining = debit.amount.checked_sub(&new_paid)?;
        let payment_status = if new_remaining.amount() <= Decimal::ZERO {
            PaymentStatus::Paid
        } else if new_paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        };

        Ok(DebitPaymentUpdate {
            payment_status,
            paid_amount: new_paid,
            remaining_amount: new_remaining.clamp_non_negative(),
            is_partial_payment: payment_status == PaymentStatus::Partial,
            payment_date: Some(details.paid_date),
            payment_notes: details.notes.clone(),
        })
    }

    /// Records a manual payment against a debit
    ///
    /// Updates the debit's payment fields, then appends a `manual_payment`
    /// credit linked to it. The update is conditional on the `paid_amount`
    /// read here, so of two concurrent payments computed from the same
    /// snapshot only one lands; the other fails with
    /// [`LedgerError::Conflict`] before any credit is written.
    pub async fn mark_debit_as_paid(
        &self,
        debit_id: LedgerEntryId,
        paid_amount: Decimal,
        details: PaymentDetails,
    ) -> Result<PaymentReceipt, LedgerError> {
        self.store.require_actor().await?;
        let debit = self.store.get(debit_id).await?;
        if !debit.is_debit() {
            return Err(LedgerError::validation(format!("entry {} is not a debit", debit_id)));
        }
        let entries = self.store.entries(debit.distributor_id).await?;
        let view = self.matcher.assess(&debit, &entries);

        let payment = Money::new(paid_amount, self.store.currency()).round_to_currency();
        let details = details.for_debit(debit_id);
        let update = Self::transition(&view, payment, &details)?;

        let updated = self
            .store
            .update_debit_payment_fields(debit_id, debit.manual_paid(), update.clone())
            .await?;

        let credit = NewEntry::credit(
            debit.distributor_id,
            payment,
            DescriptionCodec::render_payment(&debit.description),
            SourceType::ManualPayment,
            Uuid::from(debit_id),
        )
        .settles(debit_id)
        .with_payment_details(details);

        let credit = match self.store.append(credit).await {
            Ok(credit) => credit,
            Err(e) => {
                error!(
                    debit_id = %debit_id,
                    distributor_id = %debit.distributor_id,
                    amount = %payment.amount(),
                    error = %e,
                    manual_reconciliation = true,
                    "debit marked as paid but payment credit was not recorded"
                );
                return Err(e);
            }
        };

        let mut after = entries;
        after.retain(|e| e.id != debit_id);
        after.push(updated.clone());
        after.push(credit.clone());
        let view = self.matcher.assess(&updated, &after);

        info!(
            debit_id = %debit_id,
            credit_id = %credit.id,
            amount = %payment.amount(),
            payment_status = %update.payment_status,
            remaining = %view.remaining_amount.amount(),
            "manual payment recorded"
        );

        Ok(PaymentReceipt {
            debit: updated,
            credit,
            view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::PaymentMethod;
    use chrono::Utc;
    use core_kernel::{ActorId, Currency, DistributorId};
    use rust_decimal_macros::dec;

    fn debit(amount: Decimal) -> LedgerEntry {
        NewEntry::debit(
            DistributorId::new(),
            Money::new(amount, Currency::USD),
            "Transferencia de 1 x Gorra (Azul)",
            SourceType::Transfer,
            Uuid::new_v4(),
        )
        .into_entry(LedgerEntryId::new_v7(), Utc::now(), ActorId::new("t").unwrap())
    }

    fn details() -> PaymentDetails {
        PaymentDetails::new(PaymentMethod::Cash, Utc::now())
    }

    #[test]
    fn test_derive_status() {
        assert_eq!(PaymentStateMachine::derive_status(dec!(100), dec!(100), dec!(0)), PaymentStatus::Pending);
        assert_eq!(PaymentStateMachine::derive_status(dec!(100), dec!(60), dec!(40)), PaymentStatus::Partial);
        assert_eq!(PaymentStateMachine::derive_status(dec!(100), dec!(0), dec!(100)), PaymentStatus::Paid);
        assert_eq!(PaymentStateMachine::derive_status(dec!(100), dec!(-1), dec!(101)), PaymentStatus::Paid);
    }

    #[test]
    fn test_partial_transition() {
        let debit = debit(dec!(100.00));
        let view = ReturnMatcher::new("devolución").assess(&debit, &[debit.clone()]);
        let update = PaymentStateMachine::transition(
            &view,
            Money::new(dec!(40.00), Currency::USD),
            &details(),
        )
        .unwrap();
        assert_eq!(update.payment_status, PaymentStatus::Partial);
        assert_eq!(update.paid_amount.amount(), dec!(40.00));
        assert_eq!(update.remaining_amount.amount(), dec!(60.00));
        assert!(update.is_partial_payment);
    }

    #[test]
    fn test_full_payment_jumps_to_paid() {
        let debit = debit(dec!(100.00));
        let view = ReturnMatcher::new("devolución").assess(&debit, &[debit.clone()]);
        let update = PaymentStateMachine::transition(
            &view,
            Money::new(dec!(100.00), Currency::USD),
            &details(),
        )
        .unwrap();
        assert_eq!(update.payment_status, PaymentStatus::Paid);
        assert!(update.remaining_amount.is_zero());
        assert!(!update.is_partial_payment);
    }

    #[test]
    fn test_overpayment_rejected() {
        let debit = debit(dec!(100.00));
        let view = ReturnMatcher::new("devolución").assess(&debit, &[debit.clone()]);
        let result = PaymentStateMachine::transition(
            &view,
            Money::new(dec!(100.01), Currency::USD),
            &details(),
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        let debit = debit(dec!(100.00));
        let view = ReturnMatcher::new("devolución").assess(&debit, &[debit.clone()]);
        let result = PaymentStateMachine::transition(&view, Money::zero(Currency::USD), &details());
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }
}
