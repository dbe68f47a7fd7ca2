//! Financial inputs shared by the four models.
//!
//! Built once per run, either from normalized statements or from a
//! [`FinancialSnapshot`]. The two sources differ on two signs, and both are
//! preserved: statements keep the signed fixed-capital sum and take the
//! magnitude of interest expense; snapshots subtract `|capex|` and use interest
//! expense as given.

use serde::Serialize;

use super::types::{CashFlowInputs, FinancialSnapshot};
use crate::statement::{resolve_item, Frequency, LineItem, NormalizedStatement};

/// Where the inputs were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Statements,
    Snapshot,
}

/// Resolved line items for one valuation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialInputs {
    pub source: InputSource,
    /// Frequency of the statement window
    pub frequency: Frequency,
    pub net_income: f64,
    pub depreciation: f64,
    pub interest_expense: f64,
    pub receivables_change: f64,
    pub inventories_change: f64,
    pub payables_change: f64,
    pub working_capital_investment: f64,
    pub fixed_capital_investment: f64,
    pub proceeds_from_borrowings: f64,
    pub repayment_of_borrowings: f64,
    pub net_borrowing: f64,
    pub short_term_debt: f64,
    pub long_term_debt: f64,
    pub total_debt: f64,
    pub cash: f64,
    /// Resolved equity, before the assets-minus-liabilities fallback
    pub total_equity: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    /// EPS supplied directly, overriding net income / shares
    pub earnings_per_share: Option<f64>,
}

impl FinancialInputs {
    /// Resolve inputs from normalized statements. Flow items follow the income
    /// statement's window; balance-sheet items always read the latest value.
    pub fn from_statements(
        income: &NormalizedStatement,
        cash_flow: &NormalizedStatement,
        balance: &NormalizedStatement,
    ) -> Self {
        let quarterly = income.is_quarterly();
        let flow = |item| resolve_item(&cash_flow.table, item, quarterly);
        let stock = |item| resolve_item(&balance.table, item, false);

        let receivables_change = flow(LineItem::ReceivablesChange);
        let inventories_change = flow(LineItem::InventoriesChange);
        let payables_change = flow(LineItem::PayablesChange);
        let proceeds_from_borrowings = flow(LineItem::ProceedsFromBorrowings);
        let repayment_of_borrowings = flow(LineItem::RepaymentOfBorrowings);
        let short_term_debt = stock(LineItem::ShortTermDebt);
        let long_term_debt = stock(LineItem::LongTermDebt);

        Self {
            source: InputSource::Statements,
            frequency: income.frequency,
            net_income: resolve_item(&income.table, LineItem::NetIncome, quarterly),
            depreciation: flow(LineItem::Depreciation),
            interest_expense: resolve_item(&income.table, LineItem::InterestExpense, quarterly),
            receivables_change,
            inventories_change,
            payables_change,
            working_capital_investment: receivables_change + inventories_change - payables_change,
            fixed_capital_investment: flow(LineItem::FixedCapital),
            proceeds_from_borrowings,
            repayment_of_borrowings,
            // Repayments are reported as outflows by some sources and magnitudes by others
            net_borrowing: proceeds_from_borrowings - repayment_of_borrowings.abs(),
            short_term_debt,
            long_term_debt,
            total_debt: short_term_debt + long_term_debt,
            cash: stock(LineItem::Cash),
            total_equity: stock(LineItem::TotalEquity),
            total_assets: stock(LineItem::TotalAssets),
            total_liabilities: stock(LineItem::TotalLiabilities),
            earnings_per_share: None,
        }
    }

    /// Inputs from directly supplied figures.
    pub fn from_snapshot(snapshot: &FinancialSnapshot, frequency: Frequency) -> Self {
        Self {
            source: InputSource::Snapshot,
            frequency,
            net_income: snapshot.net_income_ttm,
            depreciation: snapshot.depreciation,
            interest_expense: snapshot.interest_expense,
            receivables_change: 0.0,
            inventories_change: 0.0,
            payables_change: 0.0,
            working_capital_investment: snapshot.working_capital_change,
            fixed_capital_investment: -snapshot.capex.abs(),
            proceeds_from_borrowings: 0.0,
            repayment_of_borrowings: 0.0,
            net_borrowing: snapshot.net_borrowing,
            short_term_debt: 0.0,
            long_term_debt: 0.0,
            total_debt: snapshot.total_debt,
            cash: snapshot.cash,
            total_equity: snapshot.total_equity,
            total_assets: snapshot.total_assets,
            total_liabilities: snapshot.total_liabilities,
            earnings_per_share: snapshot.earnings_per_share,
        }
    }

    /// Interest added back to FCFF after tax.
    pub fn interest_after_tax(&self, tax_rate: f64) -> f64 {
        let interest = match self.source {
            InputSource::Statements => self.interest_expense.abs(),
            InputSource::Snapshot => self.interest_expense,
        };
        interest * (1.0 - tax_rate)
    }

    /// Base free cash flow to equity.
    pub fn fcfe_base(&self) -> f64 {
        self.net_income + self.depreciation + self.net_borrowing - self.working_capital_investment
            + self.fixed_capital_investment
    }

    /// Base free cash flow to the firm.
    pub fn fcff_base(&self, tax_rate: f64) -> f64 {
        self.net_income + self.depreciation + self.interest_after_tax(tax_rate)
            - self.working_capital_investment
            + self.fixed_capital_investment
    }

    /// Book equity for P/B, falling back to assets minus liabilities.
    pub fn book_equity(&self) -> f64 {
        if self.total_equity != 0.0 {
            return self.total_equity;
        }
        match self.source {
            InputSource::Statements if self.total_assets > 0.0 && self.total_liabilities >= 0.0 => {
                self.total_assets - self.total_liabilities
            }
            InputSource::Statements => 0.0,
            InputSource::Snapshot => self.total_assets - self.total_liabilities,
        }
    }

    /// Components of the FCFE base flow.
    pub fn equity_components(&self) -> CashFlowInputs {
        CashFlowInputs {
            net_borrowing: Some(self.net_borrowing),
            ..self.common_components()
        }
    }

    /// Components of the FCFF base flow.
    pub fn firm_components(&self, tax_rate: f64) -> CashFlowInputs {
        CashFlowInputs {
            interest_expense: Some(self.interest_expense),
            interest_after_tax: Some(self.interest_after_tax(tax_rate)),
            ..self.common_components()
        }
    }

    fn common_components(&self) -> CashFlowInputs {
        CashFlowInputs {
            net_income: self.net_income,
            depreciation: self.depreciation,
            net_borrowing: None,
            interest_expense: None,
            interest_after_tax: None,
            receivables_change: self.receivables_change,
            inventories_change: self.inventories_change,
            payables_change: self.payables_change,
            working_capital_investment: self.working_capital_investment,
            fixed_capital_investment: self.fixed_capital_investment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{normalize, Cell, StatementTable};

    fn annual(table: StatementTable) -> NormalizedStatement {
        normalize(&table, Frequency::Year)
    }

    fn statements() -> (NormalizedStatement, NormalizedStatement, NormalizedStatement) {
        let income = StatementTable::from_rows(
            &["yearReport", "lengthReport", "Net Profit For the Year", "Interest Expenses"],
            vec![vec![2024.0, 4.0, 1000.0, -80.0], vec![2023.0, 4.0, 900.0, -70.0]],
        );
        let cash_flow = StatementTable::from_rows(
            &[
                "yearReport",
                "lengthReport",
                "Depreciation and Amortisation",
                "Increase/Decrease in receivables",
                "Increase/Decrease in inventories",
                "Increase/Decrease in payables",
                "Purchase of fixed assets",
                "Proceeds from disposal of fixed assets",
                "Proceeds from borrowings",
                "Repayment of borrowings",
            ],
            vec![vec![2024.0, 4.0, 200.0, 50.0, 30.0, 20.0, -300.0, 10.0, 400.0, -250.0]],
        );
        let balance = StatementTable::from_rows(
            &[
                "yearReport",
                "lengthReport",
                "Short-term borrowings",
                "Long-term borrowings",
                "Cash and cash equivalents",
                "Total Assets",
                "Total Liabilities",
            ],
            vec![vec![
                Cell::from(2024.0),
                Cell::from(4.0),
                Cell::from(500.0),
                Cell::from(700.0),
                Cell::from(350.0),
                Cell::from(9000.0),
                Cell::from(5000.0),
            ]],
        );
        (annual(income), annual(cash_flow), annual(balance))
    }

    #[test]
    fn test_from_statements() {
        let (income, cash_flow, balance) = statements();
        let inputs = FinancialInputs::from_statements(&income, &cash_flow, &balance);

        assert_eq!(inputs.source, InputSource::Statements);
        assert_eq!(inputs.net_income, 1000.0);
        assert_eq!(inputs.depreciation, 200.0);
        assert_eq!(inputs.working_capital_investment, 60.0);
        assert_eq!(inputs.fixed_capital_investment, -290.0);
        assert_eq!(inputs.net_borrowing, 150.0);
        assert_eq!(inputs.total_debt, 1200.0);
        assert_eq!(inputs.cash, 350.0);

        // 1000 + 200 + 150 - 60 - 290
        assert!((inputs.fcfe_base() - 1000.0).abs() < 1e-9);
        // 1000 + 200 + 80 * 0.8 - 60 - 290
        assert!((inputs.fcff_base(0.2) - 914.0).abs() < 1e-9);
    }

    #[test]
    fn test_book_equity_falls_back_to_assets_less_liabilities() {
        let (income, cash_flow, balance) = statements();
        let inputs = FinancialInputs::from_statements(&income, &cash_flow, &balance);
        assert_eq!(inputs.total_equity, 0.0);
        assert_eq!(inputs.book_equity(), 4000.0);
    }

    #[test]
    fn test_statement_fallback_requires_positive_assets() {
        let inputs = FinancialInputs {
            total_assets: 0.0,
            total_liabilities: 100.0,
            ..FinancialInputs::from_snapshot(&FinancialSnapshot::default(), Frequency::Year)
        };
        let statements = FinancialInputs {
            source: InputSource::Statements,
            ..inputs.clone()
        };
        assert_eq!(statements.book_equity(), 0.0);
        assert_eq!(inputs.book_equity(), -100.0);
    }

    #[test]
    fn test_snapshot_sign_conventions() {
        let snapshot = FinancialSnapshot {
            net_income_ttm: 200.0,
            depreciation: 100.0,
            capex: -200.0,
            net_borrowing: 50.0,
            working_capital_change: 30.0,
            interest_expense: -40.0,
            ..Default::default()
        };
        let inputs = FinancialInputs::from_snapshot(&snapshot, Frequency::Year);

        assert_eq!(inputs.fixed_capital_investment, -200.0);
        // 200 + 100 + 50 - 30 - 200
        assert!((inputs.fcfe_base() - 120.0).abs() < 1e-9);
        // Snapshot interest is used as given: 200 + 100 - 32 - 30 - 200
        assert!((inputs.fcff_base(0.2) - 38.0).abs() < 1e-9);
    }

    #[test]
    fn test_quarterly_window_sums_flows_but_not_balances() {
        let income = normalize(
            &StatementTable::from_rows(
                &["yearReport", "lengthReport", "Net Profit For the Year"],
                vec![
                    vec![2024.0, 1.0, 10.0],
                    vec![2024.0, 2.0, 20.0],
                    vec![2023.0, 4.0, 30.0],
                    vec![2023.0, 3.0, 40.0],
                ],
            ),
            Frequency::Quarter,
        );
        let balance = normalize(
            &StatementTable::from_rows(
                &["yearReport", "lengthReport", "Cash"],
                vec![vec![2024.0, 2.0, 5.0], vec![2024.0, 1.0, 4.0]],
            ),
            Frequency::Quarter,
        );
        let empty = normalize(&StatementTable::empty(), Frequency::Quarter);

        let inputs = FinancialInputs::from_statements(&income, &empty, &balance);
        assert_eq!(inputs.frequency, Frequency::Quarter);
        assert_eq!(inputs.net_income, 100.0);
        assert_eq!(inputs.cash, 5.0);
        assert_eq!(inputs.depreciation, 0.0);
    }
}
