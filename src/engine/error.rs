use serde::Serialize;

use crate::engine::account::AccountNumber;
use crate::engine::clients::ClientId;
use crate::engine::transaction::TransactionRow;
use crate::engine::Decimal;

/// Top-level error type for the ledger.
///
/// Only infrastructure failures end up here. Business rule violations are
/// reported as a [`Rejection`] inside the transaction outcome.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Account lock poisoned")]
    LockPoisoned,
}

/// Failures raised by the account store, ledger or client directory backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Account {account} not found")]
    AccountNotFound { account: AccountNumber },

    #[error("Client {client} not found")]
    ClientNotFound { client: ClientId },

    #[error("Opening balance must not be negative, got {amount}")]
    NegativeOpeningBalance { amount: Decimal },

    #[error("Backend lock poisoned")]
    Poisoned,
}

/// Errors during `TransactionRow` -> `TransactionRequest` conversion (hard errors).
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(TransactionRow),
}

/// Expected, caller-recoverable reasons for refusing a transaction.
/// A rejected request leaves every balance and the ledger untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("Account {account} not found")]
    AccountNotFound { account: AccountNumber },

    #[error("Invalid amount {amount}: must be greater than zero")]
    InvalidAmount { amount: Decimal },

    #[error("Insufficient funds: account {account} has {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountNumber,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Transfer requires a destination account")]
    MissingDestination,

    #[error("Destination account {account} not found")]
    DestinationNotFound { account: AccountNumber },

    #[error("Account {account} cannot transfer to itself")]
    SelfTransfer { account: AccountNumber },

    #[error("Crediting {amount} to account {account} would overflow its balance of {balance}")]
    BalanceOverflow {
        account: AccountNumber,
        balance: Decimal,
        amount: Decimal,
    },
}

/// Field-less discriminant of [`Rejection`], for callers matching on the kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    AccountNotFound,
    InvalidAmount,
    InsufficientFunds,
    MissingDestination,
    DestinationNotFound,
    SelfTransfer,
    BalanceOverflow,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::AccountNotFound { .. } => RejectionKind::AccountNotFound,
            Rejection::InvalidAmount { .. } => RejectionKind::InvalidAmount,
            Rejection::InsufficientFunds { .. } => RejectionKind::InsufficientFunds,
            Rejection::MissingDestination => RejectionKind::MissingDestination,
            Rejection::DestinationNotFound { .. } => RejectionKind::DestinationNotFound,
            Rejection::SelfTransfer { .. } => RejectionKind::SelfTransfer,
            Rejection::BalanceOverflow { .. } => RejectionKind::BalanceOverflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejection_messages() {
        let err = Rejection::InsufficientFunds {
            account: AccountNumber::from("CHK-00000001-001"),
            available: dec!(50),
            requested: dec!(100),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: account CHK-00000001-001 has 50, requested 100"
        );
        assert_eq!(
            Rejection::MissingDestination.to_string(),
            "Transfer requires a destination account"
        );
    }

    #[test]
    fn test_rejection_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&Rejection::MissingDestination.kind()).unwrap();
        assert_eq!(json, "\"MISSING_DESTINATION\"");

        let overflow = Rejection::BalanceOverflow {
            account: AccountNumber::from("CHK-00000001-001"),
            balance: dec!(1),
            amount: Decimal::MAX,
        };
        let json = serde_json::to_string(&overflow.kind()).unwrap();
        assert_eq!(json, "\"BALANCE_OVERFLOW\"");
    }
}
