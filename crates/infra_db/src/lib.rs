//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the distributor ledger using SQLx.
//!
//! # Architecture
//!
//! Repositories own the SQL and row types; adapters implement the ledger's
//! ports on top of them. Ledger rows are append-only except for the
//! payment-tracking columns of debits, which a guard trigger enforces.
//!
//! Live subscriptions use LISTEN/NOTIFY: every write notifies the
//! distributor id, and subscribers refetch their full snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresLedgerAdapter, StreamConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/distributor_ledger")).await?;
//! let ledger = PostgresLedgerAdapter::new(pool, StreamConfig::default());
//! ```

pub mod adapters;
pub mod error;
pub mod listener;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresCatalogAdapter, PostgresInventoryAdapter, PostgresLedgerAdapter};
pub use error::DatabaseError;
pub use listener::{ReconnectBackoff, StreamConfig, LEDGER_CHANNEL};
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
