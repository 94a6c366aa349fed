use crate::LedgerResult;
use async_trait::async_trait;
use gatekeeper_types::CellValue;

/// The external tabular ledger.
///
/// Rows are 1-indexed and row 1 is the header. Implementations offer no
/// locking; [`crate::LedgerWriter`] serialises its own writes.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Number of rows currently in use, header included.
    async fn row_count(&self) -> LedgerResult<u32>;

    /// Insert `cells` as a new row at `index`, shifting any rows at or
    /// below it down.
    async fn insert_row(&self, index: u32, cells: Vec<CellValue>) -> LedgerResult<()>;

    /// Set a formula on an existing row.
    async fn set_cell_formula(&self, row: u32, column: &str, formula: &str) -> LedgerResult<()>;
}
