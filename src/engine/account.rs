use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clients::ClientId;
use super::Decimal;

/// Kind of account. Fixed at opening time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Checking,
}

impl AccountType {
    /// Prefix carried by every account number of this type
    pub fn prefix(self) -> &'static str {
        match self {
            AccountType::Savings => "SAV",
            AccountType::Checking => "CHK",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Savings => write!(f, "savings"),
            AccountType::Checking => write!(f, "checking"),
        }
    }
}

/// Account identifier of the form `SAV-12345678-042`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Builds a number from the low eight digits of the opening time in
    /// milliseconds and three random digits.
    pub(crate) fn generate(account_type: AccountType, at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis().rem_euclid(100_000_000);
        let suffix = Uuid::new_v4().as_u128() % 1000;
        Self(format!("{}-{millis:08}-{suffix:03}", account_type.prefix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountNumber {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AccountNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A balance-holding account owned by a client.
///
/// The balance is only replaced through the account store, which the
/// transaction engine drives. It never goes below zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    account_number: AccountNumber,
    account_type: AccountType,
    balance: Decimal,
    owner_id: ClientId,
    created_at: DateTime<Utc>,
}

impl Account {
    pub(super) fn new(
        account_number: AccountNumber,
        account_type: AccountType,
        owner_id: ClientId,
        balance: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut account = Self {
            account_number,
            account_type,
            balance,
            owner_id,
            created_at,
        };
        account.normalize();
        account
    }

    /// Returns the account number
    pub fn number(&self) -> &AccountNumber {
        &self.account_number
    }

    /// Returns the account type
    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// Returns the current balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Returns the owning client
    pub fn owner_id(&self) -> ClientId {
        self.owner_id
    }

    /// Returns the opening time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replace the balance with a value computed by the engine.
    /// Caller must ensure the new balance is not negative.
    ///
    /// # Panics (debug only)
    /// Panics if the new balance is negative.
    pub(super) fn set_balance(&mut self, balance: Decimal) {
        self.balance = balance;
        self.normalize();
        #[cfg(debug_assertions)]
        self.assert_invariant();
    }

    /// Assert the no-overdraft invariant: balance >= 0
    #[cfg(debug_assertions)]
    fn assert_invariant(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance of {} is negative ({})",
            self.account_number,
            self.balance
        );
    }

    /// Trim trailing zeros so balances compare and print consistently.
    fn normalize(&mut self) {
        self.balance = self.balance.normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(balance: Decimal) -> Account {
        Account::new(
            AccountNumber::from("CHK-00000001-001"),
            AccountType::Checking,
            ClientId::new(),
            balance,
            Utc::now(),
        )
    }

    #[test]
    fn test_generated_number_carries_type_prefix() {
        let savings = AccountNumber::generate(AccountType::Savings, Utc::now());
        let checking = AccountNumber::generate(AccountType::Checking, Utc::now());

        assert!(savings.as_str().starts_with("SAV-"));
        assert!(checking.as_str().starts_with("CHK-"));
    }

    #[test]
    fn test_generated_number_layout() {
        let number = AccountNumber::generate(AccountType::Savings, Utc::now());
        let parts: Vec<&str> = number.as_str().split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 3);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_set_balance_replaces_value() {
        let mut account = account(dec!(100));
        account.set_balance(dec!(42.5));
        assert_eq!(account.balance(), dec!(42.5));
    }

    #[test]
    fn test_normalize_trims_trailing_zeros() {
        let account = account(dec!(100.0000));
        assert_eq!(account.balance().to_string(), "100");
    }

    #[test]
    fn test_account_type_serializes_uppercase() {
        let json = serde_json::to_string(&AccountType::Savings).unwrap();
        assert_eq!(json, "\"SAVINGS\"");
    }

    #[test]
    #[should_panic(expected = "Invariant violated")]
    #[cfg(debug_assertions)]
    fn test_negative_balance_trips_invariant() {
        let mut account = account(dec!(10));
        account.set_balance(dec!(-1));
    }
}
