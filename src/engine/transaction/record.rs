use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{account::AccountNumber, transaction::TransactionType, Decimal};

/// Time-ordered transaction identifier, displayed as `TXN-<hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TXN-{}", self.0.simple().to_string().to_uppercase())
    }
}

/// Immutable ledger entry produced by the engine for each applied request.
///
/// A transfer produces a single record filed under the source account with
/// the destination as counterparty. `balance_after` is the primary account's
/// balance right after the record was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    id: TransactionId,
    account_number: AccountNumber,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    amount: Decimal,
    timestamp: DateTime<Utc>,
    description: String,
    balance_after: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    counterparty_account: Option<AccountNumber>,
}

impl TransactionRecord {
    pub(crate) fn new(
        account_number: AccountNumber,
        transaction_type: TransactionType,
        amount: Decimal,
        timestamp: DateTime<Utc>,
        description: String,
        balance_after: Decimal,
        counterparty_account: Option<AccountNumber>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_number,
            transaction_type,
            amount,
            timestamp,
            description,
            balance_after: balance_after.normalize(),
            counterparty_account,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn account_number(&self) -> &AccountNumber {
        &self.account_number
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn balance_after(&self) -> Decimal {
        self.balance_after
    }

    pub fn counterparty_account(&self) -> Option<&AccountNumber> {
        self.counterparty_account.as_ref()
    }

    /// True when the account is either the primary or the counterparty
    pub fn involves(&self, account: &AccountNumber) -> bool {
        self.account_number == *account || self.counterparty_account.as_ref() == Some(account)
    }

    /// Signed change this record caused to `account`'s balance.
    /// A self-transfer nets to zero.
    pub fn net_effect_on(&self, account: &AccountNumber) -> Decimal {
        let mut effect = Decimal::ZERO;
        if self.account_number == *account {
            effect += match self.transaction_type {
                TransactionType::Deposit => self.amount,
                TransactionType::Withdrawal | TransactionType::Transfer => -self.amount,
            };
        }
        if self.counterparty_account.as_ref() == Some(account) {
            effect += self.amount;
        }
        effect
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} account={} amount={} balance_after={}",
            self.transaction_type, self.id, self.account_number, self.amount, self.balance_after
        )?;
        if let Some(counterparty) = &self.counterparty_account {
            write!(f, " counterparty={counterparty}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn transfer(from: &str, to: &str, amount: Decimal) -> TransactionRecord {
        TransactionRecord::new(
            AccountNumber::from(from),
            TransactionType::Transfer,
            amount,
            Utc::now(),
            format!("Transfer to {to}"),
            dec!(0),
            Some(AccountNumber::from(to)),
        )
    }

    #[test]
    fn test_transfer_involves_both_sides() {
        let record = transfer("CHK-1", "SAV-2", dec!(10));

        assert!(record.involves(&AccountNumber::from("CHK-1")));
        assert!(record.involves(&AccountNumber::from("SAV-2")));
        assert!(!record.involves(&AccountNumber::from("SAV-3")));
    }

    #[test]
    fn test_net_effect_of_transfer() {
        let record = transfer("CHK-1", "SAV-2", dec!(10));

        assert_eq!(record.net_effect_on(&AccountNumber::from("CHK-1")), dec!(-10));
        assert_eq!(record.net_effect_on(&AccountNumber::from("SAV-2")), dec!(10));
        assert_eq!(record.net_effect_on(&AccountNumber::from("SAV-3")), dec!(0));
    }

    #[test]
    fn test_net_effect_of_self_transfer_is_zero() {
        let record = transfer("CHK-1", "CHK-1", dec!(10));
        assert_eq!(record.net_effect_on(&AccountNumber::from("CHK-1")), dec!(0));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(TransactionId::new(), TransactionId::new());
        assert!(TransactionId::new().to_string().starts_with("TXN-"));
    }

    #[test]
    fn test_serialized_record_uses_iso_timestamps() {
        let record = transfer("CHK-1", "SAV-2", dec!(10));
        let json = serde_json::to_value(&record).unwrap();

        let raw = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(raw).is_ok());
        assert_eq!(json["type"], "TRANSFER");
        assert_eq!(json["counterpartyAccount"], "SAV-2");

        let back: TransactionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
