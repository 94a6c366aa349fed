//! Gatekeeper ledger
//!
//! Appends one row per successful verification to an external tabular
//! ledger. The ledger itself (storage, formula evaluation) lives behind
//! [`LedgerBackend`]; this crate decides where a row goes and what its
//! derived cells contain.
//!
//! Rows are 1-indexed with a header on row 1. A new row always lands at
//! `row_count + 1` and never overwrites an existing one.

#![deny(unsafe_code)]

mod backend;
mod error;
pub mod layout;
pub mod memory;
mod writer;

pub use backend::LedgerBackend;
pub use error::{LedgerError, LedgerResult};
pub use layout::LedgerLayout;
pub use memory::InMemoryLedger;
pub use writer::LedgerWriter;
