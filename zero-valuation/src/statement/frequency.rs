//! Frequency normalization.
//!
//! Reduces a raw statement table to the window the models read: the latest full
//! year, or the four latest quarters.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

use super::{Cell, Frequency, StatementTable, LENGTH_COLUMN, YEAR_COLUMN};

/// Rows kept for a quarterly window.
pub const QUARTER_WINDOW: usize = 4;

const TIME_KEYWORDS: [&str; 4] = ["year", "quarter", "date", "time"];

static YEAR_FIRST_QUARTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>\d{4})\s*[-/ ]?\s*Q(?P<q>[1-4])$").expect("valid regex")
});

static QUARTER_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Q(?P<q>[1-4])\s*[-/ ]?\s*(?P<year>\d{4})$").expect("valid regex")
});

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%Y%m%d"];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A statement reduced to its analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStatement {
    /// Frequency the window represents
    pub frequency: Frequency,
    pub table: StatementTable,
}

impl NormalizedStatement {
    pub fn is_quarterly(&self) -> bool {
        self.frequency.is_quarterly()
    }
}

/// Reduce `table` to the latest window for `requested`.
///
/// - no time-bearing column: the table is returned unchanged
/// - `yearReport` + `lengthReport`: sorted newest first; quarter takes the top
///   four rows, year takes the newest full-year row (or the newest row)
/// - another time column with at least one parseable value: sorted newest
///   first, then head-4 / head-1
/// - anything else: the first row
pub fn normalize(table: &StatementTable, requested: Frequency) -> NormalizedStatement {
    let time_columns: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            let lower = name.to_lowercase();
            TIME_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .map(|(i, _)| i)
        .collect();
    let has_quarter_column = table.columns.iter().any(|name| {
        let lower = name.to_lowercase();
        lower.contains("lengthreport") || lower.contains("quarter")
    });

    if time_columns.is_empty() && !has_quarter_column {
        return NormalizedStatement {
            frequency: requested,
            table: table.clone(),
        };
    }

    if let (Some(year_col), Some(length_col)) = (
        table.column_index(YEAR_COLUMN),
        table.column_index(LENGTH_COLUMN),
    ) {
        return by_report_period(table, requested, year_col, length_col);
    }

    if let Some(&time_col) = time_columns.first() {
        let dates: Vec<Option<NaiveDate>> = (0..table.row_count())
            .map(|row| parse_period_date(table.cell(row, time_col)))
            .collect();

        if dates.iter().any(Option::is_some) {
            let mut order: Vec<usize> = (0..table.row_count()).collect();
            order.sort_by(|&a, &b| descending_missing_last(dates[a], dates[b]));
            let sorted = table.select_rows(&order);
            return window(sorted, requested);
        }

        tracing::debug!(column = %table.columns[time_col], "No parseable period values");
    }

    NormalizedStatement {
        frequency: requested,
        table: table.head(1),
    }
}

fn by_report_period(
    table: &StatementTable,
    requested: Frequency,
    year_col: usize,
    length_col: usize,
) -> NormalizedStatement {
    let mut order: Vec<usize> = (0..table.row_count()).collect();
    order.sort_by(|&a, &b| {
        let years = descending_missing_last_f64(table.value(a, year_col), table.value(b, year_col));
        years.then_with(|| {
            descending_missing_last_f64(table.value(a, length_col), table.value(b, length_col))
        })
    });
    let sorted = table.select_rows(&order);

    match requested {
        Frequency::Quarter => window(sorted, Frequency::Quarter),
        Frequency::Year => {
            let full_year = (0..sorted.row_count())
                .find(|&row| sorted.value(row, length_col) == Some(4.0))
                .unwrap_or(0);
            let table = if sorted.is_empty() {
                sorted
            } else {
                sorted.select_rows(&[full_year])
            };
            NormalizedStatement {
                frequency: Frequency::Year,
                table,
            }
        }
    }
}

fn window(sorted: StatementTable, requested: Frequency) -> NormalizedStatement {
    let rows = match requested {
        Frequency::Quarter => QUARTER_WINDOW,
        Frequency::Year => 1,
    };
    if sorted.row_count() < rows && requested.is_quarterly() {
        tracing::debug!(
            available = sorted.row_count(),
            "Fewer than four quarters available"
        );
    }
    NormalizedStatement {
        frequency: requested,
        table: sorted.head(rows),
    }
}

fn descending_missing_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn descending_missing_last_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Interpret a period cell as a date. Bare four-digit years and quarter labels
/// (`2024-Q3`, `Q3 2024`) are accepted alongside calendar dates.
pub fn parse_period_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Number(v) if v.is_finite() && v.fract() == 0.0 && (1000.0..=9999.0).contains(v) => {
            NaiveDate::from_ymd_opt(*v as i32, 1, 1)
        }
        Cell::Text(s) => parse_date_text(s.trim()),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = YEAR_FIRST_QUARTER
        .captures(s)
        .or_else(|| QUARTER_FIRST.captures(s))
    {
        let year: i32 = caps["year"].parse().ok()?;
        let quarter: u32 = caps["q"].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, quarter * 3, 1);
    }

    if s.len() == 4 {
        if let Ok(year) = s.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn report_table() -> StatementTable {
        StatementTable::from_rows(
            &["yearReport", "lengthReport", "Net Profit For the Year"],
            vec![
                vec![Cell::from(2023.0), Cell::from(3.0), Cell::from(30.0)],
                vec![Cell::from(2024.0), Cell::from(1.0), Cell::from(41.0)],
                vec![Cell::from(2023.0), Cell::from(4.0), Cell::from(40.0)],
                vec![Cell::Missing, Cell::from(2.0), Cell::from(99.0)],
                vec![Cell::from(2024.0), Cell::from(2.0), Cell::from(42.0)],
                vec![Cell::from(2023.0), Cell::from(2.0), Cell::from(20.0)],
            ],
        )
    }

    #[test]
    fn test_quarter_window_newest_first() {
        let normalized = normalize(&report_table(), Frequency::Quarter);
        assert_eq!(normalized.frequency, Frequency::Quarter);
        assert_eq!(normalized.table.row_count(), 4);
        let labels: Vec<String> = normalized
            .table
            .periods()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(labels, vec!["2024Q2", "2024Q1", "2023Q4", "2023Q3"]);
    }

    #[test]
    fn test_year_prefers_full_year_row() {
        let normalized = normalize(&report_table(), Frequency::Year);
        assert_eq!(normalized.frequency, Frequency::Year);
        assert_eq!(normalized.table.row_count(), 1);
        assert_eq!(normalized.table.value(0, 2), Some(40.0));
    }

    #[test]
    fn test_year_without_full_year_takes_newest() {
        let table = StatementTable::from_rows(
            &["yearReport", "lengthReport", "x"],
            vec![vec![2023.0, 2.0, 1.0], vec![2024.0, 1.0, 2.0]],
        );
        let normalized = normalize(&table, Frequency::Year);
        assert_eq!(normalized.table.value(0, 2), Some(2.0));
    }

    #[test]
    fn test_short_quarter_window() {
        let table = StatementTable::from_rows(
            &["yearReport", "lengthReport", "x"],
            vec![vec![2024.0, 1.0, 1.0], vec![2024.0, 2.0, 2.0]],
        );
        let normalized = normalize(&table, Frequency::Quarter);
        assert_eq!(normalized.table.row_count(), 2);
    }

    #[test]
    fn test_no_time_column_unchanged() {
        let table = StatementTable::from_rows(&["Revenue"], vec![vec![1.0], vec![2.0]]);
        let normalized = normalize(&table, Frequency::Quarter);
        assert_eq!(normalized.frequency, Frequency::Quarter);
        assert_eq!(normalized.table, table);
    }

    #[test]
    fn test_generic_date_column_sorted() {
        let table = StatementTable::from_rows(
            &["reportDate", "Revenue"],
            vec![
                vec![Cell::from("2023-12-31"), Cell::from(1.0)],
                vec![Cell::from("garbage"), Cell::from(9.0)],
                vec![Cell::from("2024-06-30"), Cell::from(3.0)],
                vec![Cell::from("2024-03-31"), Cell::from(2.0)],
            ],
        );
        let quarter = normalize(&table, Frequency::Quarter);
        assert_eq!(quarter.table.column_values(1), vec![3.0, 2.0, 1.0, 9.0]);

        let year = normalize(&table, Frequency::Year);
        assert_eq!(year.frequency, Frequency::Year);
        assert_eq!(year.table.column_values(1), vec![3.0]);
    }

    #[test]
    fn test_unparseable_dates_take_first_row() {
        let table = StatementTable::from_rows(
            &["period time", "Revenue"],
            vec![
                vec![Cell::from("soon"), Cell::from(5.0)],
                vec![Cell::from("later"), Cell::from(6.0)],
            ],
        );
        let normalized = normalize(&table, Frequency::Quarter);
        assert_eq!(normalized.frequency, Frequency::Quarter);
        assert_eq!(normalized.table.column_values(1), vec![5.0]);
    }

    #[test_case(Cell::from("2024-Q3"), Some((2024, 9, 1)) ; "year first quarter")]
    #[test_case(Cell::from("Q1 2023"), Some((2023, 3, 1)) ; "quarter first")]
    #[test_case(Cell::from(2022.0), Some((2022, 1, 1)) ; "numeric year")]
    #[test_case(Cell::from("2021"), Some((2021, 1, 1)) ; "year text")]
    #[test_case(Cell::from("2024-01-15T00:00:00Z"), Some((2024, 1, 15)) ; "rfc3339")]
    #[test_case(Cell::from("2023-06-30"), Some((2023, 6, 30)) ; "iso date")]
    #[test_case(Cell::from("soon"), None ; "free text")]
    #[test_case(Cell::from(12.0), None ; "out of range number")]
    #[test_case(Cell::Missing, None ; "missing")]
    fn test_parse_period_labels(cell: Cell, expected: Option<(i32, u32, u32)>) {
        let expected = expected.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        assert_eq!(parse_period_date(&cell), expected);
    }
}
