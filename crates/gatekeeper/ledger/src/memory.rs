//! In-memory ledger backend.
//!
//! Deterministic and test-friendly: it counts every call, can be made
//! unreachable or slow, and can simulate another writer appending a row
//! behind our back.

use crate::layout::column_index;
use crate::{LedgerBackend, LedgerError, LedgerResult};
use async_trait::async_trait;
use gatekeeper_types::CellValue;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Calls received by an [`InMemoryLedger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCalls {
    pub row_count: u32,
    pub insert_row: u32,
    pub set_cell_formula: u32,
}

impl LedgerCalls {
    pub fn total(&self) -> u32 {
        self.row_count + self.insert_row + self.set_cell_formula
    }

    pub fn writes(&self) -> u32 {
        self.insert_row + self.set_cell_formula
    }
}

/// Vector-of-rows ledger. Index 0 holds row 1 (the header).
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    rows: RwLock<Vec<Vec<CellValue>>>,
    row_count_calls: AtomicU32,
    insert_calls: AtomicU32,
    formula_calls: AtomicU32,
    unreachable: AtomicBool,
    foreign_append_pending: AtomicBool,
    fail_formulas: AtomicBool,
    delay_ms: AtomicU32,
}

impl InMemoryLedger {
    /// An empty ledger with no header row.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger whose first row is `header`.
    pub fn with_header<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ledger = Self::new();
        ledger.push_literal_row(header);
        ledger
    }

    /// Append a row of literals without counting it as a call.
    pub fn push_literal_row<I, S>(&self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut rows) = self.rows.write() {
            rows.push(
                cells
                    .into_iter()
                    .map(|c| CellValue::Literal(c.into()))
                    .collect(),
            );
        }
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        let ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Make every formula write fail, leaving inserted rows incomplete.
    pub fn set_fail_formulas(&self, fail: bool) {
        self.fail_formulas.store(fail, Ordering::SeqCst);
    }

    /// On the next insert, another writer appends a row right after ours.
    pub fn simulate_foreign_append(&self) {
        self.foreign_append_pending.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> LedgerCalls {
        LedgerCalls {
            row_count: self.row_count_calls.load(Ordering::SeqCst),
            insert_row: self.insert_calls.load(Ordering::SeqCst),
            set_cell_formula: self.formula_calls.load(Ordering::SeqCst),
        }
    }

    /// Cell at 1-indexed `row` and lettered `column`.
    pub fn cell(&self, row: u32, column: &str) -> Option<CellValue> {
        let col = column_index(column)? as usize;
        let rows = self.rows.read().ok()?;
        rows.get(row.checked_sub(1)? as usize)?.get(col).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn enter(&self, counter: &AtomicU32) -> LedgerResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unreachable(
                "in-memory ledger marked unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerBackend for InMemoryLedger {
    async fn row_count(&self) -> LedgerResult<u32> {
        self.enter(&self.row_count_calls).await?;
        let rows = self
            .rows
            .read()
            .map_err(|_| LedgerError::Unreachable("ledger lock poisoned".to_string()))?;
        u32::try_from(rows.len())
            .map_err(|_| LedgerError::Inconsistent("row count overflow".to_string()))
    }

    async fn insert_row(&self, index: u32, cells: Vec<CellValue>) -> LedgerResult<()> {
        self.enter(&self.insert_calls).await?;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| LedgerError::Unreachable("ledger lock poisoned".to_string()))?;

        let position = index
            .checked_sub(1)
            .map(|p| p as usize)
            .filter(|p| *p <= rows.len())
            .ok_or_else(|| {
                LedgerError::Rejected(format!(
                    "cannot insert row {} into a ledger of {} rows",
                    index,
                    rows.len()
                ))
            })?;
        rows.insert(position, cells);

        if self.foreign_append_pending.swap(false, Ordering::SeqCst) {
            rows.push(vec![CellValue::Literal("foreign".to_string())]);
        }
        Ok(())
    }

    async fn set_cell_formula(&self, row: u32, column: &str, formula: &str) -> LedgerResult<()> {
        self.enter(&self.formula_calls).await?;
        if self.fail_formulas.load(Ordering::SeqCst) {
            return Err(LedgerError::Rejected(format!(
                "formula write to {}{} refused",
                column, row
            )));
        }
        let col = column_index(column)
            .ok_or_else(|| LedgerError::Rejected(format!("invalid column `{}`", column)))?
            as usize;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| LedgerError::Unreachable("ledger lock poisoned".to_string()))?;
        let cells = row
            .checked_sub(1)
            .and_then(|r| rows.get_mut(r as usize))
            .ok_or_else(|| LedgerError::Rejected(format!("row {} does not exist", row)))?;

        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Literal(String::new()));
        }
        cells[col] = CellValue::Formula(formula.to_string());
        Ok(())
    }
}
