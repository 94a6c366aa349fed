//! Sequential verification appends.

use crate::{LedgerBackend, LedgerError, LedgerLayout, LedgerResult};
use gatekeeper_types::{CellValue, LedgerRow, VerificationRecord};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Appends verification rows to a [`LedgerBackend`].
///
/// Reading the row count and inserting after it is a read-modify-write on
/// a store with no locking of its own. Writes from this process are queued
/// behind `write_lock`; edits made by anyone else are detected after the
/// fact by re-reading the row count, not prevented.
pub struct LedgerWriter {
    backend: Arc<dyn LedgerBackend>,
    layout: LedgerLayout,
    call_timeout: Duration,
    write_lock: Mutex<()>,
}

impl LedgerWriter {
    pub fn new(
        backend: Arc<dyn LedgerBackend>,
        layout: LedgerLayout,
        call_timeout: Duration,
    ) -> LedgerResult<Self> {
        layout.validate()?;
        Ok(Self {
            backend,
            layout,
            call_timeout,
            write_lock: Mutex::new(()),
        })
    }

    pub fn layout(&self) -> &LedgerLayout {
        &self.layout
    }

    /// Append `record` at the next unused row and return what was written.
    pub async fn append_verification(&self, record: &VerificationRecord) -> LedgerResult<LedgerRow> {
        if !record.is_valid() {
            return Err(LedgerError::InvalidRecord(
                "record is unacknowledged or incomplete".to_string(),
            ));
        }

        let _queued = self.write_lock.lock().await;

        let count = self.bounded(self.backend.row_count()).await?;
        if count == 0 {
            return Err(LedgerError::Inconsistent(
                "ledger has no header row".to_string(),
            ));
        }
        let next_row = count + 1;
        let row = self.layout.row_for(next_row, record)?;

        debug!(row = next_row, username = %row.username, "Appending verification row");

        let cells = self.literal_cells(&row)?;
        if let Err(err) = self.bounded(self.backend.insert_row(next_row, cells)).await {
            return Err(self.classify_failed_insert(count, row, err).await);
        }

        if let Err(err) = self.complete_row(&row).await {
            warn!(row = next_row, error = %err, "Ledger row left incomplete");
            return Err(LedgerError::PartiallyCommitted {
                row: Box::new(row),
                reason: err.to_string(),
            });
        }

        info!(row = next_row, username = %row.username, "Verification recorded in ledger");
        Ok(row)
    }

    /// Formulas, then the row count check.
    async fn complete_row(&self, row: &LedgerRow) -> LedgerResult<()> {
        self.bounded(self.backend.set_cell_formula(
            row.row,
            &self.layout.count_column,
            &row.count_formula,
        ))
        .await?;
        self.bounded(self.backend.set_cell_formula(
            row.row,
            &self.layout.score_column,
            &row.score_formula,
        ))
        .await?;

        let after = self.bounded(self.backend.row_count()).await?;
        if after != row.row {
            warn!(
                expected = row.row,
                found = after,
                "Ledger row count changed underneath an append; concurrent external edit"
            );
            return Err(LedgerError::Inconsistent(format!(
                "expected {} rows after append, found {}",
                row.row, after
            )));
        }
        Ok(())
    }

    /// A failed or timed-out insert may still have landed. Re-read the row
    /// count to tell the two apart.
    async fn classify_failed_insert(
        &self,
        count_before: u32,
        row: LedgerRow,
        err: LedgerError,
    ) -> LedgerError {
        match self.bounded(self.backend.row_count()).await {
            Ok(now) if now > count_before => {
                warn!(row = row.row, error = %err, "Insert reported failure but the row landed");
                LedgerError::PartiallyCommitted {
                    row: Box::new(row),
                    reason: err.to_string(),
                }
            }
            _ => err,
        }
    }

    /// Username and user id placed in their columns, blanks in between.
    fn literal_cells(&self, row: &LedgerRow) -> LedgerResult<Vec<CellValue>> {
        let username_col = crate::layout::column_index(&self.layout.username_column);
        let user_id_col = crate::layout::column_index(&self.layout.user_id_column);
        let (Some(username_col), Some(user_id_col)) = (username_col, user_id_col) else {
            return Err(LedgerError::Layout("invalid literal columns".to_string()));
        };

        let width = username_col.max(user_id_col) as usize + 1;
        let mut cells = vec![CellValue::Literal(String::new()); width];
        cells[username_col as usize] = CellValue::Literal(row.username.clone());
        cells[user_id_col as usize] = CellValue::Literal(row.user_id.clone());
        Ok(cells)
    }

    async fn bounded<T>(&self, call: impl Future<Output = LedgerResult<T>>) -> LedgerResult<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| LedgerError::Timeout(self.call_timeout))?
    }
}
