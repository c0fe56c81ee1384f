//! Test Utilities Crate
//!
//! Shared test infrastructure for the distributor ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built catalog, money and date values
//! - `builders`: Ledger entry builder and the in-memory [`TestLedger`] harness
//! - `assertions`: Assertion helpers for money, entries and summaries
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
