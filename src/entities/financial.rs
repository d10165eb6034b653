// 💰 Financial Record Entity - one cash-flow ledger line
//
// Amounts are exact decimals. The type tag decides which KPI a line
// contributes to; the amount itself is never signed.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// RECORD TYPE & STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    Income,
    Expense,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Income => "INCOME",
            RecordType::Expense => "EXPENSE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    Pending,
    Paid,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "PENDING",
            RecordStatus::Paid => "PAID",
        }
    }
}

/// Raised when stored or submitted text is not a known tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tag '{}'", self.0)
    }
}

impl std::error::Error for UnknownTag {}

impl FromStr for RecordType {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(RecordType::Income),
            "EXPENSE" => Ok(RecordType::Expense),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RecordStatus::Pending),
            "PAID" => Ok(RecordStatus::Paid),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

// ============================================================================
// FINANCIAL RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFinancialRecord {
    pub description: String,
    pub amount: Decimal,
    pub kind: RecordType,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub due_date: NaiveDate,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl FinancialRecord {
    /// Book a validated ledger line. Lines entered through the cash-flow
    /// form are settled on entry, so they start as PAID.
    pub fn book(new: NewFinancialRecord) -> Self {
        FinancialRecord {
            id: uuid::Uuid::new_v4().to_string(),
            description: new.description,
            amount: new.amount,
            kind: new.kind,
            due_date: new.due_date,
            status: RecordStatus::Paid,
            created_at: Utc::now(),
        }
    }

    pub fn is_income(&self) -> bool {
        self.kind == RecordType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == RecordType::Expense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_defaults_to_paid() {
        let rec = FinancialRecord::book(NewFinancialRecord {
            description: "Aluguel".to_string(),
            amount: Decimal::new(50000, 2),
            kind: RecordType::Expense,
            due_date: NaiveDate::from_ymd_opt(2024, 2, 6).unwrap(),
        });

        assert_eq!(rec.status, RecordStatus::Paid);
        assert!(rec.is_expense());
        assert!(!rec.is_income());
    }

    #[test]
    fn test_type_tags_are_case_sensitive() {
        assert_eq!("INCOME".parse::<RecordType>(), Ok(RecordType::Income));
        assert_eq!("EXPENSE".parse::<RecordType>(), Ok(RecordType::Expense));
        assert!("income".parse::<RecordType>().is_err());
    }
}
