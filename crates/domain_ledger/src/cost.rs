//! Distributor cost resolution
//!
//! Resolution order, first match wins:
//!
//! 1. variant `distributor_cost` when positive
//! 2. product `distributor_cost` when positive
//! 3. `(variant price ?? product price) / (1 + VAT) × (1 − discount)`
//! 4. the caller's `base_price` through the same formula, only when the
//!    catalog could not answer
//!
//! Costs are returned unrounded; rounding happens where a value is persisted.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use core_kernel::{round_money, with_timeout, PortError, Rate};

use crate::catalog::{CatalogPort, LineItem, Product, Variant};
use crate::config::LedgerConfig;
use crate::error::LedgerError;

/// Where a unit cost came from, in decreasing order of confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    VariantDistributorCost,
    ProductDistributorCost,
    PriceFallback,
    BasePriceFallback,
}

impl CostSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostSource::VariantDistributorCost => "variant_distributor_cost",
            CostSource::ProductDistributorCost => "product_distributor_cost",
            CostSource::PriceFallback => "price_fallback",
            CostSource::BasePriceFallback => "base_price_fallback",
        }
    }
}

impl fmt::Display for CostSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-unit cost before tax
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitCost {
    pub amount: Decimal,
    pub source: CostSource,
}

impl UnitCost {
    pub fn rounded(&self) -> Decimal {
        round_money(self.amount, 2)
    }
}

fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v > Decimal::ZERO)
}

/// Computes distributor unit costs from the catalog
#[derive(Clone)]
pub struct CostResolver {
    catalog: Arc<dyn CatalogPort>,
    vat: Rate,
    discount: Rate,
    timeout: Duration,
}

impl CostResolver {
    pub fn new(catalog: Arc<dyn CatalogPort>, config: &LedgerConfig) -> Self {
        Self {
            catalog,
            vat: config.vat(),
            discount: config.discount(),
            timeout: config.collaborator_timeout(),
        }
    }

    /// Net distributor cost for a VAT-inclusive retail price
    pub fn price_to_cost(&self, price: Decimal) -> Decimal {
        self.discount.deduct_from(self.vat.remove_from(price))
    }

    /// Value credited for returning `quantity` units, VAT included, unrounded
    pub fn return_value(&self, unit: &UnitCost, quantity: u32) -> Decimal {
        self.vat.add_to(unit.amount * Decimal::from(quantity))
    }

    /// The catalog part of the cascade (steps 1 to 3)
    pub fn resolve_from(&self, product: Option<&Product>, variant: Option<&Variant>) -> Option<UnitCost> {
        if let Some(amount) = positive(variant.and_then(|v| v.distributor_cost)) {
            return Some(UnitCost {
                amount,
                source: CostSource::VariantDistributorCost,
            });
        }
        if let Some(amount) = positive(product.and_then(|p| p.distributor_cost)) {
            return Some(UnitCost {
                amount,
                source: CostSource::ProductDistributorCost,
            });
        }
        positive(variant.and_then(|v| v.price))
            .or_else(|| positive(product.map(|p| p.price)))
            .map(|price| UnitCost {
                amount: self.price_to_cost(price),
                source: CostSource::PriceFallback,
            })
    }

    /// Resolves the unit cost of a line item
    ///
    /// The product is only fetched when the variant carries no cost of its
    /// own. Catalog failures fall through to the caller's base price.
    pub async fn resolve(&self, item: &LineItem) -> Result<UnitCost, LedgerError> {
        let lookup = with_timeout("catalog_lookup", self.timeout, async {
            let variant = self.catalog.get_variant(item.variant_id).await?;
            if let Some(cost) = self.resolve_from(None, variant.as_ref()) {
                if cost.source == CostSource::VariantDistributorCost {
                    return Ok(Some(cost));
                }
            }
            let product = self.catalog.get_product(item.product_id).await?;
            Ok(self.resolve_from(product.as_ref(), variant.as_ref()))
        })
        .await;

        let failure = match lookup {
            Ok(Some(cost)) => {
                debug!(
                    product_id = %item.product_id,
                    variant_id = %item.variant_id,
                    cost_source = %cost.source,
                    unit_cost = %cost.amount,
                    "unit cost resolved"
                );
                return Ok(cost);
            }
            Ok(None) => PortError::not_found("CatalogItem", item.variant_id),
            Err(e) => e,
        };

        match positive(item.base_price) {
            Some(base_price) => {
                let cost = UnitCost {
                    amount: self.price_to_cost(base_price),
                    source: CostSource::BasePriceFallback,
                };
                warn!(
                    product_id = %item.product_id,
                    variant_id = %item.variant_id,
                    cost_source = %cost.source,
                    unit_cost = %cost.amount,
                    error = %failure,
                    "catalog lookup failed, using caller base price"
                );
                Ok(cost)
            }
            None if failure.is_not_found() => Err(LedgerError::validation(format!(
                "no price available for {} ({})",
                item.product_name, item.variant_name
            ))),
            None => Err(LedgerError::Upstream(failure)),
        }
    }
}
