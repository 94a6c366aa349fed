use gatekeeper_types::LedgerRow;
use std::time::Duration;
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger write failures. Any of these halts a verify flow before the
/// role grant.
///
/// Only [`LedgerError::PartiallyCommitted`] means a row was left behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    #[error("ledger inconsistent: {0}")]
    Inconsistent(String),

    #[error("ledger call timed out after {0:?}")]
    Timeout(Duration),

    #[error("ledger rejected the write: {0}")]
    Rejected(String),

    #[error("invalid ledger layout: {0}")]
    Layout(String),

    #[error("invalid verification record: {0}")]
    InvalidRecord(String),

    /// The row was inserted but the append did not complete.
    #[error("ledger row {} written but not completed: {reason}", .row.row)]
    PartiallyCommitted { row: Box<LedgerRow>, reason: String },
}

impl LedgerError {
    /// The row this failed append left in the ledger, if any.
    pub fn committed_row(&self) -> Option<&LedgerRow> {
        match self {
            LedgerError::PartiallyCommitted { row, .. } => Some(row.as_ref()),
            _ => None,
        }
    }
}
