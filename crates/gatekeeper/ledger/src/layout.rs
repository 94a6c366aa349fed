//! Column layout and derived formulas of a verification row.

use crate::{LedgerError, LedgerResult};
use gatekeeper_types::{LedgerRow, VerificationRecord};
use serde::{Deserialize, Serialize};

/// Where each cell of a verification row goes.
///
/// The count formula counts filled cells in a fixed horizontal range of the
/// same row. The score formula divides the cell directly left of the score
/// column by a fixed vertical sum over that column, scaled by
/// `score_scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerLayout {
    pub username_column: String,
    pub user_id_column: String,
    pub count_column: String,
    pub score_column: String,
    pub count_range_start: String,
    pub count_range_end: String,
    pub score_sum_first_row: u32,
    pub score_sum_last_row: u32,
    pub score_scale: u32,
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            username_column: "A".to_string(),
            user_id_column: "B".to_string(),
            count_column: "C".to_string(),
            score_column: "D".to_string(),
            count_range_start: "E".to_string(),
            count_range_end: "Z".to_string(),
            score_sum_first_row: 2,
            score_sum_last_row: 1000,
            score_scale: 70,
        }
    }
}

impl LedgerLayout {
    pub fn validate(&self) -> LedgerResult<()> {
        for column in [
            &self.username_column,
            &self.user_id_column,
            &self.count_column,
            &self.score_column,
            &self.count_range_start,
            &self.count_range_end,
        ] {
            column_index(column)
                .ok_or_else(|| LedgerError::Layout(format!("invalid column `{}`", column)))?;
        }
        if column_index(&self.username_column) == column_index(&self.user_id_column) {
            return Err(LedgerError::Layout(
                "username and user id share a column".to_string(),
            ));
        }
        self.score_source_column()?;
        if column_index(&self.count_range_start) > column_index(&self.count_range_end) {
            return Err(LedgerError::Layout(format!(
                "count range {}:{} is reversed",
                self.count_range_start, self.count_range_end
            )));
        }
        if self.score_sum_first_row < 2 || self.score_sum_first_row > self.score_sum_last_row {
            return Err(LedgerError::Layout(format!(
                "score sum rows {}..{} must start after the header and not be reversed",
                self.score_sum_first_row, self.score_sum_last_row
            )));
        }
        Ok(())
    }

    /// The column the score formula divides, directly left of the score.
    pub fn score_source_column(&self) -> LedgerResult<String> {
        column_index(&self.score_column)
            .and_then(|idx| idx.checked_sub(1))
            .map(column_letters)
            .ok_or_else(|| {
                LedgerError::Layout(format!(
                    "score column `{}` has no column to its left",
                    self.score_column
                ))
            })
    }

    pub fn count_formula(&self, row: u32) -> String {
        format!(
            "=COUNTA({start}{row}:{end}{row})",
            start = self.count_range_start,
            end = self.count_range_end,
        )
    }

    pub fn score_formula(&self, row: u32) -> LedgerResult<String> {
        let source = self.score_source_column()?;
        Ok(format!(
            "=({source}{row}/SUM(${source}${first}:${source}${last}))*{scale}",
            first = self.score_sum_first_row,
            last = self.score_sum_last_row,
            scale = self.score_scale,
        ))
    }

    /// Everything written for `record` when it lands on `row`.
    pub fn row_for(&self, row: u32, record: &VerificationRecord) -> LedgerResult<LedgerRow> {
        Ok(LedgerRow {
            row,
            username: record.external_username.clone(),
            user_id: record.external_user_id.clone(),
            count_formula: self.count_formula(row),
            score_formula: self.score_formula(row)?,
        })
    }
}

/// Zero-based index of a column given in letters (`A` = 0, `AA` = 26).
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let value = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        index = index * 26 + value;
    }
    Some(index - 1)
}

/// Inverse of [`column_index`].
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}
