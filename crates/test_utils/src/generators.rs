//! Property-Based Test Generators
//!
//! Proptest strategies for ledger amounts, quantities and descriptions.

use core_kernel::{Currency, Money};
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_ledger::{DescriptionCodec, LineItemKey};

/// Positive amounts in cents, up to 100,000.00
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

pub fn usd_money_strategy() -> impl Strategy<Value = Money> {
    positive_amount_strategy().prop_map(|amount| Money::new(amount, Currency::USD))
}

/// Unit quantities for transfers and returns
pub fn quantity_strategy() -> impl Strategy<Value = u32> {
    1u32..50u32
}

/// Rates between 0 and 1 with four decimal places
pub fn rate_decimal_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..10000u32).prop_map(|n| Decimal::new(n as i64, 4))
}

/// Product names without the separators the description codec splits on
pub fn product_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-zÁÉÍÓÚáéíóúñÑ][A-Za-zÁÉÍÓÚáéíóúñÑ ]{0,20}[A-Za-zñ]"
}

pub fn variant_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{1,8}(/[A-Z]{1,3})?"
}

/// A split of `total` cents into `parts` positive payments
pub fn payment_split_strategy(total_cents: i64) -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(1i64..=total_cents.max(1), 1..6).prop_map(move |weights| {
        let sum: i64 = weights.iter().sum();
        let mut remaining = total_cents;
        let mut parts = Vec::with_capacity(weights.len());
        for (i, w) in weights.iter().enumerate() {
            let share = if i + 1 == weights.len() {
                remaining
            } else {
                (total_cents * w / sum).min(remaining)
            };
            remaining -= share;
            if share > 0 {
                parts.push(Decimal::new(share, 2));
            }
        }
        parts
    })
}

/// A rendered transfer description with the quantity, product and variant used
pub fn transfer_description_strategy() -> impl Strategy<Value = (String, u32, String, String)> {
    (quantity_strategy(), product_name_strategy(), variant_name_strategy()).prop_map(
        |(quantity, product, variant)| {
            let description = DescriptionCodec::render_transfer(quantity, &product, &variant);
            (description, quantity, product, variant)
        },
    )
}
