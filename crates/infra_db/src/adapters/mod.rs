//! Domain Adapters
//!
//! PostgreSQL implementations of the ledger's collaborator ports. Each
//! adapter translates between domain values and repository rows and maps
//! [`DatabaseError`](crate::DatabaseError) onto `PortError`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresCatalogAdapter, PostgresInventoryAdapter, PostgresLedgerAdapter};
//!
//! let ledger = PostgresLedgerAdapter::new(pool.clone(), StreamConfig::default());
//! let catalog = PostgresCatalogAdapter::new(pool.clone());
//! let inventory = PostgresInventoryAdapter::new(pool);
//! ```

pub mod catalog;
pub mod ledger;

pub use catalog::{PostgresCatalogAdapter, PostgresInventoryAdapter};
pub use ledger::PostgresLedgerAdapter;
