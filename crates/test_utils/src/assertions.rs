//! Custom Test Assertions
//!
//! Assertion helpers for ledger types that give more meaningful failure
//! messages than standard assertions.

use core_kernel::Money;
use domain_ledger::{DebitView, EnhancedLedgerSummary, LedgerEntry, PaymentStatus};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies differ or the amounts differ by more than `tolerance`
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a Money value has the given amount
pub fn assert_money_eq(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Expected {} {}, got {} {}",
        actual.currency().symbol(),
        expected,
        actual.currency().symbol(),
        actual.amount()
    );
}

pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts a debit's stored payment tracking
pub fn assert_debit_tracking(
    entry: &LedgerEntry,
    status: PaymentStatus,
    paid: Decimal,
    remaining: Decimal,
) {
    let tracking = entry
        .tracking
        .as_ref()
        .unwrap_or_else(|| panic!("Entry {} has no debit tracking", entry.id));
    assert_eq!(
        tracking.payment_status, status,
        "Debit {} status: expected {:?}, got {:?}",
        entry.id, status, tracking.payment_status
    );
    assert_money_eq(&tracking.paid_amount, paid);
    assert_money_eq(&tracking.remaining_amount, remaining);
    assert_eq!(
        tracking.is_partial_payment,
        status == PaymentStatus::Partial,
        "Debit {} partial flag disagrees with status {:?}",
        entry.id,
        status
    );
}

/// Asserts the return-adjusted view of a debit
pub fn assert_debit_view(view: &DebitView, status: PaymentStatus, remaining: Decimal) {
    assert_eq!(
        view.payment_status, status,
        "Debit {} view status: expected {:?}, got {:?}",
        view.debit.id, status, view.payment_status
    );
    assert_money_eq(&view.remaining_amount, remaining);
}

/// Asserts `balance == total_debit - total_credit`
pub fn assert_summary_balanced(summary: &EnhancedLedgerSummary) {
    assert_eq!(
        summary.balance.amount(),
        summary.total_debit.amount() - summary.total_credit.amount(),
        "Summary balance {} does not equal debits {} minus credits {}",
        summary.balance.amount(),
        summary.total_debit.amount(),
        summary.total_credit.amount()
    );
}

/// Asserts entries are ordered newest first
pub fn assert_newest_first(entries: &[LedgerEntry]) {
    for pair in entries.windows(2) {
        assert!(
            pair[0].created_at >= pair[1].created_at,
            "Entry {} ({}) is listed before older entry {} ({})",
            pair[1].id,
            pair[1].created_at,
            pair[0].id,
            pair[0].created_at
        );
    }
}
