use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::account::{Account, AccountNumber, AccountType};
use super::clients::{
    Client, ClientDirectory, ClientId, ClientUpdate, InMemoryClientDirectory, NewClient,
};
use super::error::{Error, StoreError};
use super::ledger::{InMemoryLedger, Ledger};
use super::outcome::TransactionOutcome;
use super::store::{AccountStore, InMemoryAccountStore};
use super::transaction::{TransactionRecord, TransactionRequest};
use super::transaction_engine::TransactionEngine;
use super::Decimal;

/// Account decorated with its owner's name. The name fields are empty when
/// the owner cannot be found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    #[serde(flatten)]
    pub account: Account,
    pub owner_last_name: Option<String>,
    pub owner_first_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountCounts {
    pub savings: usize,
    pub checking: usize,
    pub total: usize,
}

/// Activity of one account over a closed time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub account: AccountView,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    /// Newest first
    pub transactions: Vec<TransactionRecord>,
}

/// Administrative surface around the transaction engine: account and
/// client lifecycle, decorated views, aggregates and statements.
pub struct Bank<S = InMemoryAccountStore, L = InMemoryLedger, C = InMemoryClientDirectory> {
    engine: TransactionEngine<S, L>,
    clients: Arc<C>,
}

impl<S: AccountStore, L: Ledger, C: ClientDirectory> Bank<S, L, C> {
    pub fn new(engine: TransactionEngine<S, L>, clients: Arc<C>) -> Self {
        Self { engine, clients }
    }

    pub fn engine(&self) -> &TransactionEngine<S, L> {
        &self.engine
    }

    pub fn clients(&self) -> &Arc<C> {
        &self.clients
    }

    pub fn execute(&self, request: &TransactionRequest) -> Result<TransactionOutcome, Error> {
        self.engine.execute(request)
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    pub fn register_client(&self, client: NewClient) -> Result<Client, Error> {
        Ok(self.clients.register(client)?)
    }

    pub fn update_client(&self, id: &ClientId, update: ClientUpdate) -> Result<Client, Error> {
        Ok(self.clients.update(id, update)?)
    }

    pub fn all_clients(&self) -> Result<Vec<Client>, Error> {
        Ok(self.clients.all()?)
    }

    pub fn search_clients(&self, term: &str) -> Result<Vec<Client>, Error> {
        Ok(self.clients.search(term)?)
    }

    /// Remove a client and close every account it owns.
    /// Returns the number of accounts closed.
    pub fn remove_client(&self, id: &ClientId) -> Result<usize, Error> {
        if self.clients.find(id)?.is_none() {
            return Err(StoreError::ClientNotFound { client: *id }.into());
        }

        let owned = self.engine.accounts().find_by_owner(id)?;
        for account in &owned {
            self.close_account(account.number())?;
        }
        self.clients.remove(id)?;

        log::debug!("Removed client {id} and {} accounts", owned.len());
        Ok(owned.len())
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    /// Open an account for an existing client
    pub fn open_account(
        &self,
        account_type: AccountType,
        owner: ClientId,
        initial_balance: Decimal,
    ) -> Result<Account, Error> {
        if self.clients.find(&owner)?.is_none() {
            return Err(StoreError::ClientNotFound { client: owner }.into());
        }
        Ok(self
            .engine
            .accounts()
            .create(account_type, owner, initial_balance)?)
    }

    /// Delete an account and every ledger record involving it.
    /// Returns the number of records removed.
    pub fn close_account(&self, number: &AccountNumber) -> Result<usize, Error> {
        let purged = self.engine.locks().with_locked(&[number], || {
            self.engine.accounts().delete(number)?;
            Ok::<_, Error>(self.engine.ledger().purge_account(number)?)
        })??;

        log::debug!("Closed account {number}, {purged} records removed");
        Ok(purged)
    }

    pub fn account(&self, number: &AccountNumber) -> Result<Option<AccountView>, Error> {
        let account = self.engine.accounts().find_by_number(number)?;
        Ok(account.map(|a| self.decorate(a)))
    }

    pub fn accounts(&self) -> Result<Vec<AccountView>, Error> {
        let accounts = self.engine.accounts().all()?;
        Ok(accounts.into_iter().map(|a| self.decorate(a)).collect())
    }

    pub fn accounts_of(&self, owner: &ClientId) -> Result<Vec<AccountView>, Error> {
        let accounts = self.engine.accounts().find_by_owner(owner)?;
        Ok(accounts.into_iter().map(|a| self.decorate(a)).collect())
    }

    // -------------------------------------------------------------------------
    // History & aggregates
    // -------------------------------------------------------------------------

    pub fn history(&self, number: &AccountNumber) -> Result<Vec<TransactionRecord>, Error> {
        self.engine.history(number)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, Error> {
        Ok(self.engine.ledger().recent(limit)?)
    }

    pub fn by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, Error> {
        Ok(self.engine.ledger().by_period(start, end)?)
    }

    pub fn total_balance(&self) -> Result<Decimal, Error> {
        let accounts = self.engine.accounts().all()?;
        Ok(accounts.iter().map(Account::balance).sum())
    }

    pub fn account_counts(&self) -> Result<AccountCounts, Error> {
        let accounts = self.engine.accounts().all()?;
        let savings = accounts
            .iter()
            .filter(|a| a.account_type() == AccountType::Savings)
            .count();
        Ok(AccountCounts {
            savings,
            checking: accounts.len() - savings,
            total: accounts.len(),
        })
    }

    /// Statement of `number` between `start` and `end` (inclusive).
    ///
    /// The closing balance is derived backwards from the current balance,
    /// so incoming transfers, which have no record of their own under the
    /// destination, are accounted for.
    pub fn statement(
        &self,
        number: &AccountNumber,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Statement>, Error> {
        let snapshot = self.engine.locks().with_locked(&[number], || {
            let account = self.engine.accounts().find_by_number(number)?;
            let history = self.engine.ledger().by_account(number)?;
            Ok::<_, Error>(account.map(|a| (a, history)))
        })??;
        let Some((account, history)) = snapshot else {
            return Ok(None);
        };

        let after_end: Decimal = history
            .iter()
            .filter(|r| r.timestamp() > end)
            .map(|r| r.net_effect_on(number))
            .sum();
        let transactions: Vec<TransactionRecord> = history
            .into_iter()
            .filter(|r| start <= r.timestamp() && r.timestamp() <= end)
            .collect();

        let mut total_credits = Decimal::ZERO;
        let mut total_debits = Decimal::ZERO;
        for record in &transactions {
            let effect = record.net_effect_on(number);
            if effect > Decimal::ZERO {
                total_credits += effect;
            } else {
                total_debits -= effect;
            }
        }

        let closing_balance = account.balance() - after_end;
        let opening_balance = closing_balance - total_credits + total_debits;

        Ok(Some(Statement {
            account: self.decorate(account),
            start,
            end,
            opening_balance,
            closing_balance,
            total_credits,
            total_debits,
            transactions,
        }))
    }

    fn decorate(&self, account: Account) -> AccountView {
        let owner = match self.clients.find(&account.owner_id()) {
            Ok(owner) => owner,
            Err(err) => {
                log::warn!("Owner lookup for {} failed: {err}", account.number());
                None
            }
        };
        AccountView {
            owner_last_name: owner.as_ref().map(|c| c.last_name.clone()),
            owner_first_name: owner.map(|c| c.first_name),
            account,
        }
    }
}

impl Bank {
    /// Empty in-memory bank with default engine settings
    pub fn in_memory() -> Self {
        Self::new(
            TransactionEngine::new(
                Arc::new(InMemoryAccountStore::new()),
                Arc::new(InMemoryLedger::new()),
            ),
            Arc::new(InMemoryClientDirectory::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client(bank: &Bank, last: &str) -> Client {
        bank.register_client(NewClient {
            last_name: last.to_owned(),
            first_name: "Test".to_owned(),
            ..NewClient::default()
        })
        .unwrap()
    }

    #[test]
    fn test_open_account_requires_existing_client() {
        let bank = Bank::in_memory();
        let err = bank
            .open_account(AccountType::Savings, ClientId::new(), dec!(10))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError::ClientNotFound { .. })
        ));
    }

    #[test]
    fn test_views_are_decorated_with_owner() {
        let bank = Bank::in_memory();
        let owner = client(&bank, "Curie");
        let account = bank
            .open_account(AccountType::Savings, owner.id, dec!(10))
            .unwrap();

        let view = bank.account(account.number()).unwrap().unwrap();
        assert_eq!(view.owner_last_name.as_deref(), Some("Curie"));
        assert_eq!(view.owner_first_name.as_deref(), Some("Test"));
    }

    #[test]
    fn test_missing_owner_leaves_names_empty() {
        let bank = Bank::in_memory();
        let account = bank
            .engine()
            .accounts()
            .create(AccountType::Checking, ClientId::new(), dec!(10))
            .unwrap();

        let view = bank.account(account.number()).unwrap().unwrap();
        assert!(view.owner_last_name.is_none());
        assert!(view.owner_first_name.is_none());

        let outcome = bank
            .execute(&TransactionRequest::deposit(account.number().clone(), dec!(1)))
            .unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn test_close_account_purges_history() {
        let bank = Bank::in_memory();
        let owner = client(&bank, "Noether");
        let a = bank
            .open_account(AccountType::Checking, owner.id, dec!(100))
            .unwrap();
        let b = bank
            .open_account(AccountType::Savings, owner.id, dec!(0))
            .unwrap();
        bank.execute(&TransactionRequest::deposit(a.number().clone(), dec!(5)))
            .unwrap();
        bank.execute(&TransactionRequest::transfer(
            a.number().clone(),
            b.number().clone(),
            dec!(10),
        ))
        .unwrap();

        let purged = bank.close_account(b.number()).unwrap();
        assert_eq!(purged, 1);
        assert!(bank.account(b.number()).unwrap().is_none());
        assert_eq!(bank.history(a.number()).unwrap().len(), 1);
    }

    #[test]
    fn test_close_unknown_account_fails() {
        let bank = Bank::in_memory();
        let err = bank
            .close_account(&AccountNumber::from("CHK-404"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError::AccountNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_client_cascades() {
        let bank = Bank::in_memory();
        let owner = client(&bank, "Franklin");
        let other = client(&bank, "Meitner");
        bank.open_account(AccountType::Checking, owner.id, dec!(1))
            .unwrap();
        bank.open_account(AccountType::Savings, owner.id, dec!(2))
            .unwrap();
        bank.open_account(AccountType::Savings, other.id, dec!(3))
            .unwrap();

        assert_eq!(bank.remove_client(&owner.id).unwrap(), 2);
        assert_eq!(bank.accounts().unwrap().len(), 1);
        assert_eq!(bank.all_clients().unwrap().len(), 1);
    }

    #[test]
    fn test_aggregates() {
        let bank = Bank::in_memory();
        let owner = client(&bank, "Ride");
        bank.open_account(AccountType::Checking, owner.id, dec!(10.5))
            .unwrap();
        bank.open_account(AccountType::Savings, owner.id, dec!(20))
            .unwrap();
        bank.open_account(AccountType::Savings, owner.id, dec!(0))
            .unwrap();

        assert_eq!(bank.total_balance().unwrap(), dec!(30.5));
        assert_eq!(
            bank.account_counts().unwrap(),
            AccountCounts {
                savings: 2,
                checking: 1,
                total: 3
            }
        );
    }

    #[test]
    fn test_statement_of_unknown_account_is_none() {
        let bank = Bank::in_memory();
        let now = Utc::now();
        assert!(bank
            .statement(&AccountNumber::from("CHK-404"), now, now)
            .unwrap()
            .is_none());
    }
}
