//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors surfaced by ledger operations
///
/// Validation, not-found and authorization failures are returned to the
/// caller immediately and are never retried.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input rejected before anything was written
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown debit, entry or distributor
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// No acting user could be resolved for a write
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// A stock reversal was requested against too little matched debt
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Decimal, required: Decimal },

    /// The write raced another one; retry against a fresh snapshot
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A collaborator (ledger store, catalog, inventory) failed
    #[error("Upstream error: {0}")]
    Upstream(#[source] PortError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        LedgerError::Authorization(message.into())
    }

    /// Returns true when the error came from a collaborator rather than the caller
    pub fn is_upstream(&self) -> bool {
        matches!(self, LedgerError::Upstream(_))
    }

    /// Returns true for stale writes that can be retried as-is
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

impl From<PortError> for LedgerError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => LedgerError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, field } => match field {
                Some(field) => LedgerError::Validation(format!("{}: {}", field, message)),
                None => LedgerError::Validation(message),
            },
            PortError::Unauthorized { message } => LedgerError::Authorization(message),
            PortError::Conflict { message } => LedgerError::Conflict(message),
            other => LedgerError::Upstream(other),
        }
    }
}

impl From<MoneyError> for LedgerError {
    fn from(error: MoneyError) -> Self {
        LedgerError::Validation(error.to_string())
    }
}
