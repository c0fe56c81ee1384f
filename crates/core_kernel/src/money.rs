//! Money types with precise decimal arithmetic
//!
//! Ledger amounts are kept at full decimal precision while they are being
//! computed and are only rounded (half away from zero, to the currency's
//! minor unit) at the point where they are persisted or displayed.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    MXN,
    COP,
    PEN,
    ARS,
    CLP,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::CLP => 0,
            _ => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::MXN => "MX$",
            Currency::COP => "COL$",
            Currency::PEN => "S/",
            Currency::ARS => "AR$",
            Currency::CLP => "CLP$",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::MXN => "MXN",
            Currency::COP => "COP",
            Currency::PEN => "PEN",
            Currency::ARS => "ARS",
            Currency::CLP => "CLP",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "MXN" => Ok(Currency::MXN),
            "COP" => Ok(Currency::COP),
            "PEN" => Ok(Currency::PEN),
            "ARS" => Ok(Currency::ARS),
            "CLP" => Ok(Currency::CLP),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// Rounds a decimal to `dp` places, midpoints away from zero.
///
/// This is the rounding used for every persisted or displayed ledger figure.
pub fn round_money(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// A monetary amount with associated currency
///
/// The amount is stored exactly as given; call [`Money::round_to_currency`]
/// before persisting a computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Returns true if the amount is strictly negative
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Rounds half away from zero to the currency's minor unit
    ///
    /// The result always carries exactly the currency's scale, so zero is
    /// `0.00` rather than `0`.
    pub fn round_to_currency(&self) -> Self {
        let dp = self.currency.decimal_places();
        let mut amount = round_money(self.amount, dp);
        amount.rescale(dp);
        Self {
            amount,
            currency: self.currency,
        }
    }

    /// Returns the larger of this amount and zero
    pub fn clamp_non_negative(&self) -> Self {
        if self.is_negative() {
            Self::zero(self.currency)
        } else {
            *self
        }
    }

    /// Checked addition that returns an error on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.symbol(),
            round_money(self.amount, dp),
            dp = dp as usize
        )
    }
}

/// Represents a percentage rate (e.g., a tax rate or a trade discount)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// The rate as a decimal (e.g., 0.15 for 15%)
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a decimal value (e.g., 0.15 for 15%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Returns the rate as a decimal
    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Adds the rate on top of an amount: `amount × (1 + rate)`
    pub fn add_to(&self, amount: Decimal) -> Decimal {
        amount * (Decimal::ONE + self.value)
    }

    /// Removes the rate from a gross amount: `amount / (1 + rate)`
    pub fn remove_from(&self, amount: Decimal) -> Decimal {
        amount / (Decimal::ONE + self.value)
    }

    /// Deducts the rate from an amount: `amount × (1 − rate)`
    pub fn deduct_from(&self, amount: Decimal) -> Decimal {
        amount * (Decimal::ONE - self.value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", (self.value * dec!(100)).round_dp(4))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rounding_never_moves_more_than_half_a_cent(
            mantissa in -1_000_000_000i64..1_000_000_000i64,
            scale in 0u32..6u32
        ) {
            let value = Decimal::new(mantissa, scale);
            let rounded = round_money(value, 2);
            prop_assert!((rounded - value).abs() <= dec!(0.005));
        }

        #[test]
        fn repeated_tenths_sum_exactly(n in 1u32..500u32) {
            let tenth = Money::new(dec!(0.1), Currency::USD);
            let mut total = Money::zero(Currency::USD);
            for _ in 0..n {
                total = total.checked_add(&tenth).unwrap();
            }
            prop_assert_eq!(total.amount(), Decimal::new(n as i64, 1));
        }
    }
}
