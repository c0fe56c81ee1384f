//! Distributor Ledger Domain
//!
//! Tracks what each distributor owes for transferred stock, the payments
//! they make, and the credits issued when stock is returned.
//!
//! # Entry model
//!
//! - **Debit**: debt booked at transfer or order time
//! - **Credit**: a manual payment, or a return credit booked by a stock revert
//!
//! Debits and return credits are created independently. Legacy data links
//! them only through their descriptions, which the [`DescriptionCodec`]
//! parses; new credits also carry an explicit `settles_debit_id`.
//!
//! # Components
//!
//! - [`LedgerStore`]: validated, append-only access plus live snapshots
//! - [`CostResolver`]: per-unit distributor cost with a fallback cascade
//! - [`ReturnMatcher`]: return-adjusted remaining balance of a debit
//! - [`PaymentStateMachine`]: pending → partial → paid
//! - [`SummaryAggregator`]: pure fold into an [`EnhancedLedgerSummary`]
//! - [`RevertWorkflow`]: two-phase stock reversal with a degraded outcome
//! - [`LedgerService`]: the façade used by the API
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{LedgerService, RegisterDebit};
//!
//! let service = LedgerService::new(ledger, catalog, inventory, identity, config)?;
//! let debit = service
//!     .register_debit(RegisterDebit::for_transfer(distributor, transfer, dec!(50), 2, "Pantalón Sendero", "Negro/M"))
//!     .await?;
//! let receipt = service
//!     .mark_debit_as_paid(debit.id, dec!(20), PaymentDetails::new(PaymentMethod::Cash, Utc::now()))
//!     .await?;
//! ```

pub mod catalog;
pub mod config;
pub mod cost;
pub mod description;
pub mod entry;
pub mod error;
pub mod matcher;
pub mod payment;
pub mod ports;
pub mod revert;
pub mod service;
pub mod store;
pub mod subscription;
pub mod summary;

pub use catalog::{CachedCatalog, CatalogPort, LineItem, Product, Variant};
pub use config::{LedgerConfig, DISTRIBUTOR_DISCOUNT, RETURN_MARKER, VAT_RATE};
pub use cost::{CostResolver, CostSource, UnitCost};
pub use description::{DescriptionCodec, LineItemKey, ParsedDescription};
pub use entry::{
    DebitPaymentUpdate, DebitTracking, EntryType, LedgerEntry, NewEntry, PaymentDetails,
    PaymentMethod, PaymentStatus, SourceType,
};
pub use error::LedgerError;
pub use matcher::{DebitView, ReturnMatcher, ReturnStatus};
pub use payment::{PaymentReceipt, PaymentStateMachine};
pub use ports::{FixedIdentity, IdentityProvider, InventoryPort, LedgerPort, StockReturnRequest};
pub use revert::{RevertAllocation, RevertOutcome, RevertQuote, RevertRequest, RevertWorkflow};
pub use service::{LedgerService, PaymentRegistration, RegisterDebit, RegisterPayment};
pub use store::LedgerStore;
pub use subscription::{LedgerSnapshot, LedgerSubscription};
pub use summary::{EnhancedLedgerSummary, SummaryAggregator};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{InMemoryLedger, MockCatalog, MockInventory};
