//! Ledger engine configuration

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use core_kernel::{CoreError, Currency, Rate};

/// Value-added tax applied to distributor prices
pub const VAT_RATE: Decimal = dec!(0.15);

/// Trade discount deducted from the net price when no distributor cost is set
pub const DISTRIBUTOR_DISCOUNT: Decimal = dec!(0.30);

/// Marker word that identifies legacy return credits by description
pub const RETURN_MARKER: &str = "devolución";

/// Ledger engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Currency every entry is booked in
    #[serde(default)]
    pub currency: Currency,
    /// VAT rate as a decimal fraction
    #[serde(default = "default_vat_rate")]
    pub vat_rate: Decimal,
    /// Distributor discount as a decimal fraction
    #[serde(default = "default_distributor_discount")]
    pub distributor_discount: Decimal,
    /// Marker word for legacy return credits
    #[serde(default = "default_return_marker")]
    pub return_marker: String,
    /// Deadline for catalog and inventory calls
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
    /// First reconnect delay for the live stream
    #[serde(default = "default_stream_retry_base_ms")]
    pub stream_retry_base_ms: u64,
    /// Reconnect delay ceiling for the live stream
    #[serde(default = "default_stream_retry_max_ms")]
    pub stream_retry_max_ms: u64,
    /// Lifetime of cached catalog lookups
    #[serde(default = "default_catalog_cache_ttl_secs")]
    pub catalog_cache_ttl_secs: u64,
}

fn default_vat_rate() -> Decimal {
    VAT_RATE
}

fn default_distributor_discount() -> Decimal {
    DISTRIBUTOR_DISCOUNT
}

fn default_return_marker() -> String {
    RETURN_MARKER.to_string()
}

fn default_collaborator_timeout_ms() -> u64 {
    10_000
}

fn default_stream_retry_base_ms() -> u64 {
    500
}

fn default_stream_retry_max_ms() -> u64 {
    30_000
}

fn default_catalog_cache_ttl_secs() -> u64 {
    300
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            vat_rate: default_vat_rate(),
            distributor_discount: default_distributor_discount(),
            return_marker: default_return_marker(),
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
            stream_retry_base_ms: default_stream_retry_base_ms(),
            stream_retry_max_ms: default_stream_retry_max_ms(),
            catalog_cache_ttl_secs: default_catalog_cache_ttl_secs(),
        }
    }
}

impl LedgerConfig {
    pub fn vat(&self) -> Rate {
        Rate::new(self.vat_rate)
    }

    pub fn discount(&self) -> Rate {
        Rate::new(self.distributor_discount)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    pub fn stream_retry_base(&self) -> Duration {
        Duration::from_millis(self.stream_retry_base_ms)
    }

    pub fn stream_retry_max(&self) -> Duration {
        Duration::from_millis(self.stream_retry_max_ms)
    }

    pub fn catalog_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_cache_ttl_secs)
    }

    /// Rejects rates outside `[0, 1)`, a blank marker and zero timeouts
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.vat_rate < Decimal::ZERO || self.vat_rate >= Decimal::ONE {
            return Err(CoreError::configuration(format!(
                "vat_rate must be in [0, 1), got {}",
                self.vat_rate
            )));
        }
        if self.distributor_discount < Decimal::ZERO || self.distributor_discount >= Decimal::ONE {
            return Err(CoreError::configuration(format!(
                "distributor_discount must be in [0, 1), got {}",
                self.distributor_discount
            )));
        }
        if self.return_marker.trim().is_empty() {
            return Err(CoreError::configuration("return_marker must not be blank"));
        }
        if self.collaborator_timeout_ms == 0 {
            return Err(CoreError::configuration("collaborator_timeout_ms must be positive"));
        }
        if self.stream_retry_base_ms == 0 || self.stream_retry_max_ms < self.stream_retry_base_ms {
            return Err(CoreError::configuration(
                "stream retry delays must satisfy 0 < base <= max",
            ));
        }
        Ok(())
    }
}
