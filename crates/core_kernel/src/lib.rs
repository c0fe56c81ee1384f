//! Core Kernel - Foundational types for the distributor ledger
//!
//! This crate provides the building blocks shared by the ledger engine and
//! its adapters:
//! - Money types with precise decimal arithmetic and persistence rounding
//! - Strongly-typed identifiers
//! - Port infrastructure for the hexagonal layout

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError, Rate, round_money};
pub use identifiers::{
    ActorId, DistributorId, DistributorOrderId, LedgerEntryId, ProductId, TransferId, VariantId,
};
pub use ports::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError, with_timeout,
};
pub use error::CoreError;
