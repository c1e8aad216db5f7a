mod record;
mod request;

pub use record::{TransactionId, TransactionRecord};
pub use request::TransactionRequest;

use super::Decimal;
use serde::{Deserialize, Serialize};

/// Raw transaction row as parsed from CSV input.
/// This is the unvalidated form that needs conversion to a `TransactionRequest`.
#[derive(Debug, Deserialize, Clone)]
pub struct TransactionRow {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub account: String,
    /// Required for every type; sign and magnitude are checked by the engine
    pub amount: Option<Decimal>,
    /// Required for transfers, must be empty otherwise
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl std::fmt::Display for TransactionRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (account: {}", self.tx_type, self.account)?;
        if let Some(amount) = self.amount {
            write!(f, ", amount: {amount}")?;
        }
        if let Some(destination) = &self.destination {
            write!(f, ", destination: {destination}")?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    #[serde(alias = "deposit")]
    Deposit,
    #[serde(alias = "withdrawal")]
    Withdrawal,
    #[serde(alias = "transfer")]
    Transfer,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Deposit => write!(f, "deposit"),
            TransactionType::Withdrawal => write!(f, "withdrawal"),
            TransactionType::Transfer => write!(f, "transfer"),
        }
    }
}
