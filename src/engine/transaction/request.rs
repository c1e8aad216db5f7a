use serde::{Deserialize, Serialize};

use crate::engine::{
    account::AccountNumber,
    error::TransactionError,
    transaction::{TransactionRow, TransactionType},
    Decimal,
};

/// A request submitted to the transaction engine.
///
/// The amount is not validated here. A non-positive amount is rejected by
/// the engine after the account lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub account_number: AccountNumber,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account: Option<AccountNumber>,
}

impl TransactionRequest {
    pub fn deposit(account: impl Into<AccountNumber>, amount: Decimal) -> Self {
        Self::new(account.into(), TransactionType::Deposit, amount, None)
    }

    pub fn withdrawal(account: impl Into<AccountNumber>, amount: Decimal) -> Self {
        Self::new(account.into(), TransactionType::Withdrawal, amount, None)
    }

    pub fn transfer(
        from: impl Into<AccountNumber>,
        to: impl Into<AccountNumber>,
        amount: Decimal,
    ) -> Self {
        Self::new(
            from.into(),
            TransactionType::Transfer,
            amount,
            Some(to.into()),
        )
    }

    /// Attach a free-text description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn new(
        account_number: AccountNumber,
        transaction_type: TransactionType,
        amount: Decimal,
        destination_account: Option<AccountNumber>,
    ) -> Self {
        Self {
            account_number,
            transaction_type,
            amount,
            description: None,
            destination_account,
        }
    }
}

impl TryFrom<TransactionRow> for TransactionRequest {
    type Error = TransactionError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let destination = row
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(AccountNumber::from);
        let description = row
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_owned);

        let (Some(amount), false) = (row.amount, row.account.trim().is_empty()) else {
            return Err(TransactionError::InvalidTransaction(row));
        };
        if destination.is_some() && row.tx_type != TransactionType::Transfer {
            return Err(TransactionError::InvalidTransaction(row));
        }

        Ok(TransactionRequest {
            account_number: AccountNumber::from(row.account.trim()),
            transaction_type: row.tx_type,
            amount,
            description,
            destination_account: destination,
        })
    }
}
