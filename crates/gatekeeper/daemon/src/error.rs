//! Error types for gatekeeperd

use gatekeeper_ledger::LedgerError;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Ledger wiring error
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DaemonResult<T> = Result<T, DaemonError>;
