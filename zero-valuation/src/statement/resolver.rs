//! Line item resolution.
//!
//! Data providers label the same line item differently across languages, unit
//! suffixes and schema revisions. Each [`LineItem`] carries an ordered alias
//! table; [`resolve`] walks it against a normalized statement.

use serde::{Deserialize, Serialize};

use super::StatementTable;

/// Canonical line items read by the valuation models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItem {
    NetIncome,
    Depreciation,
    InterestExpense,
    ReceivablesChange,
    InventoriesChange,
    PayablesChange,
    /// Purchases and disposals of fixed assets, netted
    FixedCapital,
    ProceedsFromBorrowings,
    RepaymentOfBorrowings,
    ShortTermDebt,
    LongTermDebt,
    Cash,
    TotalEquity,
    TotalAssets,
    TotalLiabilities,
}

impl LineItem {
    /// Synonyms in lookup order.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::NetIncome => &[
                "Net Profit For the Year",
                "Net income",
                "Profit after tax",
                "Lợi nhuận sau thuế thu nhập doanh nghiệp",
            ],
            Self::Depreciation => &[
                "Depreciation and Amortisation",
                "Depreciation and amortization",
                "Khấu hao TSCĐ",
            ],
            Self::InterestExpense => &["Interest Expenses", "Interest expense", "Chi phí lãi vay"],
            Self::ReceivablesChange => &[
                "Increase/Decrease in receivables",
                "Tăng, giảm các khoản phải thu",
            ],
            Self::InventoriesChange => &[
                "Increase/Decrease in inventories",
                "Tăng, giảm hàng tồn kho",
            ],
            Self::PayablesChange => &[
                "Increase/Decrease in payables",
                "Tăng, giảm các khoản phải trả",
            ],
            Self::FixedCapital => &[
                "Purchase of fixed assets",
                "Proceeds from disposal of fixed assets",
            ],
            Self::ProceedsFromBorrowings => {
                &["Proceeds from borrowings", "Tiền thu được các khoản đi vay"]
            }
            Self::RepaymentOfBorrowings => &["Repayment of borrowings", "Tiền trả nợ gốc vay"],
            Self::ShortTermDebt => &[
                "Short-term borrowings",
                "Vay và nợ thuê tài chính ngắn hạn",
                "Short-term debt",
                "Vay ngắn hạn",
                "Vay ngắn hạn và nợ thuê tài chính ngắn hạn",
                "Short-term borrowings and financial lease liabilities",
            ],
            Self::LongTermDebt => &[
                "Long-term borrowings",
                "Vay và nợ thuê tài chính dài hạn",
                "Long-term debt",
                "Vay dài hạn",
                "Vay dài hạn và nợ thuê tài chính dài hạn",
                "Long-term borrowings and financial lease liabilities",
            ],
            Self::Cash => &[
                "Cash and cash equivalents",
                "Tiền và các khoản tương đương tiền",
                "Cash",
                "Tiền",
            ],
            Self::TotalEquity => &[
                "Total Equity",
                "Shareholders Equity",
                "Total shareholders equity",
                "Stockholders Equity",
                "Total Stockholders Equity",
                "Vốn chủ sở hữu",
                "Tổng vốn chủ sở hữu",
                "Equity",
                "Owner's Equity",
                "Owner Equity",
                "Owners Equity",
                "Total Owner Equity",
            ],
            Self::TotalAssets => &[
                "Total Assets",
                "Assets",
                "Tổng tài sản",
                "Tổng cộng tài sản",
            ],
            Self::TotalLiabilities => &[
                "Total Liabilities",
                "Liabilities",
                "Tổng nợ phải trả",
                "Nợ phải trả",
            ],
        }
    }

    /// Balance-sheet quantities: a point-in-time figure, never summed over quarters.
    pub fn is_stock(&self) -> bool {
        matches!(
            self,
            Self::ShortTermDebt
                | Self::LongTermDebt
                | Self::Cash
                | Self::TotalEquity
                | Self::TotalAssets
                | Self::TotalLiabilities
        )
    }
}

/// Resolve a line item, applying its stock/flow policy.
pub fn resolve_item(table: &StatementTable, item: LineItem, quarterly: bool) -> f64 {
    let quarterly = quarterly && !item.is_stock();
    let value = resolve(table, item.aliases(), quarterly);
    tracing::trace!(item = ?item, quarterly, value, "Resolved line item");
    value
}

/// Resolve a value from `table` by trying `targets` in order.
///
/// A matching column contributes its first value (annual) or the sum of its
/// window (quarterly). Targets naming fixed or capital items accumulate every
/// matching column of every synonym; any other target returns on its first
/// match. Empty tables and unmatched targets give 0.
pub fn resolve(table: &StatementTable, targets: &[&str], quarterly: bool) -> f64 {
    if table.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for target in targets {
        let wanted = target.trim().to_lowercase();
        let accumulate = is_flow_component(target);

        for (index, column) in table.columns.iter().enumerate() {
            if !column_matches(column, &wanted) {
                continue;
            }
            let Some(contribution) = contribution(table, index, quarterly) else {
                continue;
            };

            tracing::debug!(target = %target, column = %column, value = contribution, "Matched column");
            if accumulate {
                total += contribution;
            } else {
                return contribution;
            }
        }
    }

    total
}

fn is_flow_component(target: &str) -> bool {
    let lower = target.to_lowercase();
    lower.contains("fixed") || lower.contains("capital")
}

/// Compare a column label against a case-folded target, with and without its
/// unit annotation (`"Cash (Bn. VND)"` matches `"cash"`).
fn column_matches(column: &str, wanted: &str) -> bool {
    let stripped = column.split('(').next().unwrap_or(column).trim().to_lowercase();
    stripped == wanted || column.trim().to_lowercase() == wanted
}

fn contribution(table: &StatementTable, column: usize, quarterly: bool) -> Option<f64> {
    let values = table.column_values(column);
    if quarterly {
        (!values.is_empty()).then(|| values.iter().sum())
    } else {
        values.first().copied()
    }
}
