//! API configuration
//!
//! Loaded from `API_*` environment variables. Nested sections use a double
//! underscore, e.g. `API_LEDGER__VAT_RATE=0.16` or `API_DATABASE__URL=...`.

use domain_ledger::LedgerConfig;
use infra_db::DatabaseConfig;
use serde::Deserialize;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            log_level: "info".to_string(),
            database: DatabaseConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.ledger.vat_rate, dec!(0.15));
        assert_eq!(config.ledger.distributor_discount, dec!(0.30));
    }

    #[test]
    fn test_partial_nested_override() {
        let config: ApiConfig = serde_json::from_str(
            r#"{"port": 9090, "ledger": {"vat_rate": "0.16"}, "database": {"url": "postgres://db/ledger"}}"#,
        )
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.ledger.vat_rate, dec!(0.16));
        assert_eq!(config.ledger.return_marker, "devolución");
        assert_eq!(config.database.url, "postgres://db/ledger");
        assert_eq!(config.jwt_expiration_secs, 3600);
    }
}
