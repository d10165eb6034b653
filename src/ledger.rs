// 📊 Ledger Aggregation - cash-flow KPIs and chart series
//
// Sums use rust_decimal so totals stay exact to the cent. Every addition is
// checked; an overflowing total is an error, never a panic.

use crate::entities::{FinancialRecord, RecordType};
use rust_decimal::Decimal;
use serde::Serialize;

/// How many recent records the cash-flow page aggregates
pub const RECENT_WINDOW: usize = 50;

/// Chart label format ("05/02")
pub const CHART_DATE_FORMAT: &str = "%d/%m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger total out of range")]
    Overflow,
}

// ============================================================================
// KPIs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    /// income - expense, negative when the clinic spent more than it earned
    pub net_balance: Decimal,
}

impl LedgerSummary {
    pub fn from_records(records: &[FinancialRecord]) -> Result<Self, LedgerError> {
        let total_income = total_of(records, RecordType::Income)?;
        let total_expense = total_of(records, RecordType::Expense)?;
        let net_balance = total_income
            .checked_sub(total_expense)
            .ok_or(LedgerError::Overflow)?;

        Ok(LedgerSummary {
            total_income,
            total_expense,
            net_balance,
        })
    }
}

/// Exact sum of every record carrying `kind`
pub fn total_of(records: &[FinancialRecord], kind: RecordType) -> Result<Decimal, LedgerError> {
    records
        .iter()
        .filter(|r| r.kind == kind)
        .try_fold(Decimal::ZERO, |total, r| {
            total.checked_add(r.amount).ok_or(LedgerError::Overflow)
        })
}

// ============================================================================
// CHART SERIES
// ============================================================================

/// One point on the income/expense area chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expense: Decimal,
}

/// Turn most-recent-first records into an oldest-first series, one point per record
pub fn chart_series(records: &[FinancialRecord]) -> Vec<ChartPoint> {
    records
        .iter()
        .rev()
        .map(|r| ChartPoint {
            date: r.due_date.format(CHART_DATE_FORMAT).to_string(),
            income: if r.is_income() { r.amount } else { Decimal::ZERO },
            expense: if r.is_expense() { r.amount } else { Decimal::ZERO },
        })
        .collect()
}

/// What the cash-flow page shows: recent lines, KPIs and the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerView {
    pub records: Vec<FinancialRecord>,
    pub summary: LedgerSummary,
    pub chart: Vec<ChartPoint>,
}

impl LedgerView {
    pub fn build(records: Vec<FinancialRecord>) -> Result<Self, LedgerError> {
        let summary = LedgerSummary::from_records(&records)?;
        let chart = chart_series(&records);
        Ok(LedgerView {
            records,
            summary,
            chart,
        })
    }
}
