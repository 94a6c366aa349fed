//! Gatekeeper daemon library
//!
//! Wiring for the `gatekeeperd` binary:
//! - layered configuration
//! - a console transport that prints outbound deliveries
//! - JSON-lines event replay against an in-memory community

#![deny(unsafe_code)]

pub mod config;
pub mod console;
pub mod error;
pub mod replay;

pub use config::GatekeeperConfig;
pub use console::ConsoleTransport;
pub use error::{DaemonError, DaemonResult};
pub use replay::{Gatekeeper, ReplaySummary};
