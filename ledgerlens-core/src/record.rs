//! Structured record types produced by a successful validation pass.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::kind::StatementKind;

/// Inclusive statement period (start <= end is enforced by the validator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl StatementPeriod {
    /// Number of days covered, counting both endpoints.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A credit-card statement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardTransaction {
    pub date: NaiveDate,
    pub description: String,
    /// Positive = charge, negative = payment/credit.
    pub amount: Decimal,
}

/// Direction of a chequing transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "debit")]
    Debit,
    #[serde(rename = "credit")]
    Credit,
}

impl TransactionType {
    pub const ALL: &'static [&'static str] = &["debit", "credit"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "debit",
            TransactionType::Credit => "credit",
        }
    }
}

/// A chequing statement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChequingTransaction {
    pub date: NaiveDate,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    pub running_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCardStatement {
    pub customer_first_name: String,
    pub customer_middle_name: Option<String>,
    pub customer_last_name: String,
    pub account_number: String,
    pub card_type: String,
    pub credit_limit: Decimal,
    pub statement_period: StatementPeriod,
    /// Document order, never re-sorted
    pub transactions: Vec<CardTransaction>,
}

impl CreditCardStatement {
    /// Full customer name with the optional middle name folded in.
    pub fn customer_name(&self) -> String {
        match &self.customer_middle_name {
            Some(middle) => format!(
                "{} {} {}",
                self.customer_first_name, middle, self.customer_last_name
            ),
            None => format!("{} {}", self.customer_first_name, self.customer_last_name),
        }
    }

    /// Sum of positive amounts (charges).
    pub fn total_charges(&self) -> Decimal {
        self.transactions
            .iter()
            .map(|t| t.amount)
            .filter(|a| a.is_sign_positive())
            .sum()
    }

    /// Sum of negative amounts (payments and refunds), as a negative number.
    pub fn total_credits(&self) -> Decimal {
        self.transactions
            .iter()
            .map(|t| t.amount)
            .filter(|a| a.is_sign_negative())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChequingStatement {
    pub bank_name: String,
    pub account_number: String,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub statement_period: StatementPeriod,
    pub transactions: Vec<ChequingTransaction>,
}

impl ChequingStatement {
    /// Closing minus opening balance.
    pub fn net_change(&self) -> Decimal {
        self.closing_balance - self.opening_balance
    }
}

/// The validated output of processing one statement.
///
/// Serialized with a `kind` tag so the JSON artifact names its own shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StructuredRecord {
    #[serde(rename = "credit_card")]
    CreditCard(CreditCardStatement),
    #[serde(rename = "chequing")]
    Chequing(ChequingStatement),
}

impl StructuredRecord {
    pub fn kind(&self) -> StatementKind {
        match self {
            StructuredRecord::CreditCard(_) => StatementKind::CreditCard,
            StructuredRecord::Chequing(_) => StatementKind::Chequing,
        }
    }

    pub fn account_number(&self) -> &str {
        match self {
            StructuredRecord::CreditCard(s) => &s.account_number,
            StructuredRecord::Chequing(s) => &s.account_number,
        }
    }

    pub fn statement_period(&self) -> StatementPeriod {
        match self {
            StructuredRecord::CreditCard(s) => s.statement_period,
            StructuredRecord::Chequing(s) => s.statement_period,
        }
    }

    pub fn transaction_count(&self) -> usize {
        match self {
            StructuredRecord::CreditCard(s) => s.transactions.len(),
            StructuredRecord::Chequing(s) => s.transactions.len(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn chequing() -> ChequingStatement {
        ChequingStatement {
            bank_name: "Northern Trust Bank".to_string(),
            account_number: "000123-456".to_string(),
            opening_balance: dec("1000.10"),
            closing_balance: dec("853.70"),
            statement_period: StatementPeriod {
                start: d(2024, 3, 1),
                end: d(2024, 3, 31),
            },
            transactions: vec![
                ChequingTransaction {
                    date: d(2024, 3, 4),
                    description: "E-Payment 8148".to_string(),
                    kind: TransactionType::Debit,
                    amount: dec("-246.40"),
                    running_balance: dec("753.70"),
                },
                ChequingTransaction {
                    date: d(2024, 3, 15),
                    description: "PAYROLL ACME INC".to_string(),
                    kind: TransactionType::Credit,
                    amount: dec("100.00"),
                    running_balance: dec("853.70"),
                },
            ],
        }
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let record = StructuredRecord::Chequing(chequing());
        let json = record.to_json_pretty().unwrap();
        let back = StructuredRecord::from_json(&json).unwrap();
        assert_eq!(back, record);

        // Decimals stay strings; trailing zeros survive
        assert!(json.contains("\"100.00\""));
        assert!(json.contains("\"2024-03-01\""));
        assert!(json.contains("\"kind\": \"chequing\""));
        assert!(json.contains("\"type\": \"debit\""));
    }

    #[test]
    fn test_optional_middle_name_serializes_as_null() {
        let record = StructuredRecord::CreditCard(CreditCardStatement {
            customer_first_name: "Ada".to_string(),
            customer_middle_name: None,
            customer_last_name: "Lovelace".to_string(),
            account_number: "XXXX-1234".to_string(),
            card_type: "Visa".to_string(),
            credit_limit: dec("5000"),
            statement_period: StatementPeriod {
                start: d(2024, 1, 1),
                end: d(2024, 1, 31),
            },
            transactions: vec![],
        });
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("customer_middle_name").unwrap().is_null());
        assert_eq!(record.transaction_count(), 0);
        assert_eq!(record.kind(), StatementKind::CreditCard);
    }

    #[test]
    fn test_period_helpers() {
        let p = StatementPeriod {
            start: d(2024, 1, 1),
            end: d(2024, 1, 31),
        };
        assert_eq!(p.days(), 31);
        assert!(p.contains(d(2024, 1, 31)));
        assert!(!p.contains(d(2024, 2, 1)));
    }

    #[test]
    fn test_net_change() {
        assert_eq!(chequing().net_change(), dec("-146.40"));
    }
}
