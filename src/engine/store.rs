use std::sync::RwLock;

use chrono::Utc;

use super::account::{Account, AccountNumber, AccountType};
use super::clients::ClientId;
use super::error::StoreError;
use super::Decimal;

/// Backing set of account records.
///
/// The store only checks existence. Business rules such as the no-overdraft
/// invariant are enforced by the transaction engine before it calls
/// [`AccountStore::update_balance`].
pub trait AccountStore: Send + Sync {
    fn find_by_number(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError>;

    /// Accounts owned by `owner`, in insertion order
    fn find_by_owner(&self, owner: &ClientId) -> Result<Vec<Account>, StoreError>;

    /// Replace (not increment) the balance of an existing account
    fn update_balance(&self, number: &AccountNumber, new_balance: Decimal)
        -> Result<(), StoreError>;

    fn create(
        &self,
        account_type: AccountType,
        owner: ClientId,
        initial_balance: Decimal,
    ) -> Result<Account, StoreError>;

    fn delete(&self, number: &AccountNumber) -> Result<(), StoreError>;

    /// Every account, in insertion order
    fn all(&self) -> Result<Vec<Account>, StoreError>;
}

/// Account store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<Vec<Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store from previously persisted accounts
    pub fn from_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }
}

impl AccountStore for InMemoryAccountStore {
    fn find_by_number(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(accounts.iter().find(|a| a.number() == number).cloned())
    }

    fn find_by_owner(&self, owner: &ClientId) -> Result<Vec<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(accounts
            .iter()
            .filter(|a| a.owner_id() == *owner)
            .cloned()
            .collect())
    }

    fn update_balance(
        &self,
        number: &AccountNumber,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().map_err(|_| StoreError::Poisoned)?;
        let account = accounts
            .iter_mut()
            .find(|a| a.number() == number)
            .ok_or_else(|| StoreError::AccountNotFound {
                account: number.clone(),
            })?;
        account.set_balance(new_balance);
        Ok(())
    }

    fn create(
        &self,
        account_type: AccountType,
        owner: ClientId,
        initial_balance: Decimal,
    ) -> Result<Account, StoreError> {
        if initial_balance < Decimal::ZERO {
            return Err(StoreError::NegativeOpeningBalance {
                amount: initial_balance,
            });
        }

        let mut accounts = self.accounts.write().map_err(|_| StoreError::Poisoned)?;
        let created_at = Utc::now();
        let number = loop {
            let candidate = AccountNumber::generate(account_type, created_at);
            if !accounts.iter().any(|a| *a.number() == candidate) {
                break candidate;
            }
        };

        let account = Account::new(number, account_type, owner, initial_balance, created_at);
        accounts.push(account.clone());
        log::debug!(
            "Opened {} account {} for client {} with {}",
            account_type,
            account.number(),
            owner,
            account.balance()
        );
        Ok(account)
    }

    fn delete(&self, number: &AccountNumber) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().map_err(|_| StoreError::Poisoned)?;
        let before = accounts.len();
        accounts.retain(|a| a.number() != number);
        if accounts.len() == before {
            return Err(StoreError::AccountNotFound {
                account: number.clone(),
            });
        }
        log::debug!("Deleted account {number}");
        Ok(())
    }

    fn all(&self) -> Result<Vec<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(accounts.clone())
    }
}
