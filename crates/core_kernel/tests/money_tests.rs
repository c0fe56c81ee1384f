//! Unit tests for the Money module
//!
//! Covers creation, persistence rounding, currency handling and the
//! rate helpers used for tax and discount calculations.

use core_kernel::{Money, Currency, MoneyError, Rate, round_money};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_keeps_full_precision() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.123456789));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::EUR);
        assert!(m.is_zero());
        assert!(!m.is_positive());
        assert_eq!(m.currency(), Currency::EUR);
    }
}

mod rounding {
    use super::*;

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        assert_eq!(round_money(dec!(0.125), 2), dec!(0.13));
        assert_eq!(round_money(dec!(0.135), 2), dec!(0.14));
        assert_eq!(round_money(dec!(-0.125), 2), dec!(-0.13));
    }

    #[test]
    fn test_rounding_is_deferred_until_requested() {
        // 3 × 3.335 = 10.005 → 10.01; rounding each unit first would give 10.02
        let total = Money::new(dec!(3.335) * dec!(3), Currency::USD);
        assert_eq!(total.amount(), dec!(10.005));
        assert_eq!(total.round_to_currency().amount(), dec!(10.01));
    }

    #[test]
    fn test_display_uses_currency_precision() {
        let m = Money::new(dec!(1234.5), Currency::USD);
        assert_eq!(m.to_string(), "$ 1234.50");
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_sub_can_go_negative() {
        let a = Money::new(dec!(10.00), Currency::USD);
        let b = Money::new(dec!(10.01), Currency::USD);
        let diff = a.checked_sub(&b).unwrap();
        assert!(diff.is_negative());
        assert!(diff.clamp_non_negative().is_zero());
    }

    #[test]
    fn test_checked_add_rejects_other_currency() {
        let usd = Money::new(dec!(10), Currency::USD);
        let mxn = Money::new(dec!(10), Currency::MXN);
        assert_eq!(
            usd.checked_add(&mxn),
            Err(MoneyError::CurrencyMismatch("USD".to_string(), "MXN".to_string()))
        );
    }

    #[test]
    fn test_hundred_tenths_make_ten() {
        let tenth = Money::new(dec!(0.1), Currency::USD);
        let total = (0..100).fold(Money::zero(Currency::USD), |acc, _| {
            acc.checked_add(&tenth).unwrap()
        });
        assert_eq!(total.amount(), dec!(10.0));
    }
}

mod rates {
    use super::*;

    #[test]
    fn test_net_of_vat_then_discount() {
        let vat = Rate::new(dec!(0.15));
        let discount = Rate::new(dec!(0.30));

        let net = discount.deduct_from(vat.remove_from(dec!(23.00)));
        assert_eq!(round_money(net, 2), dec!(14.00));
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(Rate::new(dec!(0.15)).to_string(), "15.00%");
    }
}
