//! Errors raised by pure domain rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A rule violation detected without touching storage.
///
/// Lookup failures and key conflicts only surface once a store is involved
/// and are reported by the ledger layer instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// Text that should have been an identifier was not one.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Applying a stock delta would leave a negative quantity.
    #[error("insufficient stock (available: {available}, requested delta: {delta})")]
    InsufficientStock { available: i64, delta: i64 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
