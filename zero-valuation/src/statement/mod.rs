//! Financial statement tables.
//!
//! Statements arrive from the data source in the "split" layout
//! (`{"columns": [...], "data": [[...], ...]}`), one row per reporting period.
//! Rows are not assumed to be sorted; [`frequency::normalize`] picks the window
//! the models read from.

pub mod cache;
pub mod file;
pub mod frequency;
pub mod provider;
pub mod resolver;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use cache::{CacheStats, StatementCache};
pub use file::JsonStatementAccessor;
pub use frequency::{normalize, NormalizedStatement};
pub use provider::{ProviderError, StatementAccessor};
pub use resolver::{resolve, resolve_item, LineItem};

/// Column holding the fiscal year of a period row.
pub const YEAR_COLUMN: &str = "yearReport";

/// Column holding the quarter length of a period row (4 = full year).
pub const LENGTH_COLUMN: &str = "lengthReport";

// ============================================================================
// Statement Kind & Frequency
// ============================================================================

/// The three statements the models read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "cashflow")]
    CashFlow,
    #[serde(rename = "balance")]
    Balance,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [Self::Income, Self::CashFlow, Self::Balance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::CashFlow => "cashflow",
            Self::Balance => "balance",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting frequency of a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Year,
    Quarter,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
        }
    }

    pub fn is_quarterly(&self) -> bool {
        matches!(self, Self::Quarter)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "year" | "yearly" | "annual" => Ok(Self::Year),
            "quarter" | "quarterly" => Ok(Self::Quarter),
            other => Err(format!("unknown frequency '{other}' (expected year or quarter)")),
        }
    }
}

// ============================================================================
// Cells & Tables
// ============================================================================

/// A single statement cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

static MISSING: Cell = Cell::Missing;

impl Cell {
    /// Numeric value of the cell. Numeric text counts; NaN does not.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
            Self::Missing => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(v) => v.is_nan(),
            Self::Text(s) => s.trim().is_empty(),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Number)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Period-indexed statement table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    pub columns: Vec<String>,
    #[serde(rename = "data", default)]
    pub rows: Vec<Vec<Cell>>,
}

impl StatementTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    /// Build a table from column labels and rows of cells.
    pub fn from_rows<C: Into<Cell>>(columns: &[&str], rows: Vec<Vec<C>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A table with no rows or no columns carries no data.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the column with exactly this label.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, column); short rows read as missing.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&MISSING)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        self.cell(row, column).as_f64()
    }

    /// Non-missing numeric values of a column, in row order.
    pub fn column_values(&self, column: usize) -> Vec<f64> {
        (0..self.rows.len())
            .filter_map(|row| self.value(row, column))
            .collect()
    }

    /// Copy of the table restricted to the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Copy of the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Period of a row, when the table carries `yearReport`/`lengthReport`.
    pub fn period(&self, row: usize) -> Option<PeriodDescriptor> {
        let year = self.value(row, self.column_index(YEAR_COLUMN)?)?;
        let length = self.value(row, self.column_index(LENGTH_COLUMN)?)?;
        Some(PeriodDescriptor::new(year as i32, length as u8))
    }

    /// Periods of every row that carries one.
    pub fn periods(&self) -> Vec<PeriodDescriptor> {
        (0..self.rows.len()).filter_map(|row| self.period(row)).collect()
    }
}

/// Reporting period of a statement row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDescriptor {
    pub year: i32,
    /// Number of quarters covered; 4 marks a full year.
    pub quarter_length: u8,
    pub frequency: Frequency,
}

impl PeriodDescriptor {
    pub fn new(year: i32, quarter_length: u8) -> Self {
        let frequency = if quarter_length == 4 {
            Frequency::Year
        } else {
            Frequency::Quarter
        };
        Self {
            year,
            quarter_length,
            frequency,
        }
    }

    pub fn is_full_year(&self) -> bool {
        self.quarter_length == 4
    }
}

impl fmt::Display for PeriodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter_length)
    }
}
