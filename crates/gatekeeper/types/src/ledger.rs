use serde::{Deserialize, Serialize};

/// Content of one ledger cell as handed to the ledger collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Literal(String),
    Formula(String),
}

impl CellValue {
    pub fn as_str(&self) -> &str {
        match self {
            CellValue::Literal(v) | CellValue::Formula(v) => v,
        }
    }
}

/// A verification row appended to the ledger.
///
/// `row` is 1-indexed with the header on row 1, so the first data row is 2.
/// Both formulas reference `row` itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub row: u32,
    pub username: String,
    pub user_id: String,
    pub count_formula: String,
    pub score_formula: String,
}
