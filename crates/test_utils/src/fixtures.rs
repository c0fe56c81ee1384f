//! Pre-built Test Fixtures
//!
//! Ready-to-use values for ledger tests. The catalog fixture is the
//! "Pantalón Sendero" trouser sold at 57.50 with a 30.00 product cost and
//! a 12.50 cost on its "Negro/M" variant.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{ActorId, Currency, DistributorId, Money, ProductId, TransferId, VariantId};
use domain_ledger::{LineItem, PaymentDetails, PaymentMethod, Product, Variant};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }

    /// Two units at the variant cost
    pub fn usd_transfer() -> Money {
        Money::new(dec!(25.00), Currency::USD)
    }

    /// For currency mismatch tests
    pub fn mxn_100() -> Money {
        Money::new(dec!(100.00), Currency::MXN)
    }
}

/// Fixture for the demo catalog
pub struct CatalogFixtures;

impl CatalogFixtures {
    pub const PRODUCT_NAME: &'static str = "Pantalón Sendero";
    pub const VARIANT_NAME: &'static str = "Negro/M";

    pub fn product() -> Product {
        Product {
            id: ProductId::new(),
            name: Self::PRODUCT_NAME.to_string(),
            price: dec!(57.50),
            distributor_cost: Some(dec!(30.00)),
        }
    }

    /// A variant of `product` with its own distributor cost
    pub fn variant(product: &Product, distributor_cost: Option<Decimal>) -> Variant {
        Variant {
            id: VariantId::new(),
            product_id: product.id,
            name: Self::VARIANT_NAME.to_string(),
            price: None,
            distributor_cost,
        }
    }

    pub fn line_item(product: &Product, variant: &Variant) -> LineItem {
        LineItem::new(product.id, variant.id, &product.name, &variant.name)
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn distributor_id() -> DistributorId {
        DistributorId::new()
    }

    pub fn transfer_id() -> TransferId {
        TransferId::new()
    }

    pub fn admin() -> ActorId {
        ActorId::new("admin-1").unwrap()
    }

    pub fn actor(name: &str) -> ActorId {
        ActorId::new(name).unwrap()
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Fixed reference instant (Mar 15, 2024 noon UTC)
    pub fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    pub fn days_before(days: i64) -> DateTime<Utc> {
        Self::reference_now() - Duration::days(days)
    }

    pub fn days_after(days: i64) -> DateTime<Utc> {
        Self::reference_now() + Duration::days(days)
    }
}

/// Fixture for payment details
pub struct PaymentFixtures;

impl PaymentFixtures {
    pub fn cash() -> PaymentDetails {
        PaymentDetails::new(PaymentMethod::Cash, Utc::now())
    }

    pub fn bank_transfer(reference: &str) -> PaymentDetails {
        PaymentDetails::new(PaymentMethod::BankTransfer, Utc::now()).with_reference(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_belongs_to_product() {
        let product = CatalogFixtures::product();
        let variant = CatalogFixtures::variant(&product, Some(dec!(12.50)));
        assert_eq!(variant.product_id, product.id);

        let item = CatalogFixtures::line_item(&product, &variant);
        assert_eq!(item.product_name, "Pantalón Sendero");
        assert_eq!(item.variant_name, "Negro/M");
    }

    #[test]
    fn test_temporal_offsets() {
        assert_eq!(
            TemporalFixtures::days_after(10) - TemporalFixtures::days_before(5),
            Duration::days(15)
        );
    }
}
