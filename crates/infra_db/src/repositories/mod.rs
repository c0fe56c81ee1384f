//! Repository implementations
//!
//! Repositories own the SQL and the row types. They know nothing about the
//! ledger domain; the adapters translate rows into domain values.

pub mod catalog;
pub mod ledger;

pub use catalog::{CatalogRepository, InventoryRepository};
pub use ledger::LedgerRepository;
