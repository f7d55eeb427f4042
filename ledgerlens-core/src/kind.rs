use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnsupportedKind;

/// Selects which processing path a statement takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    #[serde(rename = "credit_card")]
    CreditCard,
    #[serde(rename = "chequing")]
    Chequing,
}

impl StatementKind {
    pub const ALL: [StatementKind; 2] = [StatementKind::CreditCard, StatementKind::Chequing];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::CreditCard => "credit_card",
            StatementKind::Chequing => "chequing",
        }
    }

    /// Human label used in model instructions.
    pub fn label(&self) -> &'static str {
        match self {
            StatementKind::CreditCard => "credit card statement",
            StatementKind::Chequing => "chequing (bank account) statement",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementKind {
    type Err = UnsupportedKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit_card" | "credit-card" | "creditcard" => Ok(StatementKind::CreditCard),
            "chequing" | "checking" => Ok(StatementKind::Chequing),
            _ => Err(UnsupportedKind(s.to_string())),
        }
    }
}
