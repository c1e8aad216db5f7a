//! JSON file backend for the in-memory stores.
//!
//! The whole ledger state is one document. Timestamps are RFC 3339 strings
//! and come back as `DateTime<Utc>` on load, before any query runs.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::account::Account;
use super::bank::Bank;
use super::clients::{Client, ClientDirectory, InMemoryClientDirectory};
use super::config::EngineConfig;
use super::error::Error;
use super::ledger::{InMemoryLedger, Ledger};
use super::store::{AccountStore, InMemoryAccountStore};
use super::transaction::TransactionRecord;
use super::transaction_engine::TransactionEngine;

const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Serialized state of clients, accounts and the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Insertion order
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            clients: Vec::new(),
            accounts: Vec::new(),
            transactions: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Copy the current state out of a bank
    pub fn capture<S, L, C>(bank: &Bank<S, L, C>) -> Result<Self, Error>
    where
        S: AccountStore,
        L: Ledger,
        C: ClientDirectory,
    {
        Ok(Self {
            version: SNAPSHOT_VERSION,
            clients: bank.clients().all()?,
            accounts: bank.engine().accounts().all()?,
            transactions: bank.engine().ledger().all()?,
        })
    }

    /// Build an in-memory bank holding this state
    pub fn into_bank(self, config: EngineConfig) -> Bank {
        let newest = self
            .transactions
            .iter()
            .map(TransactionRecord::timestamp)
            .max();
        let engine = TransactionEngine::with_config(
            Arc::new(InMemoryAccountStore::from_accounts(self.accounts)),
            Arc::new(InMemoryLedger::from_records(self.transactions)),
            config,
        )
        .resuming_after(newest);
        Bank::new(
            engine,
            Arc::new(InMemoryClientDirectory::from_clients(self.clients)),
        )
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read a snapshot, or an empty one if the file doesn't exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No snapshot at {}, starting empty", path.display());
            return Ok(Self::default());
        }

        let snapshot = Self::from_reader(BufReader::new(File::open(path)?))?;
        log::info!(
            "Loaded {} clients, {} accounts, {} records from {}",
            snapshot.clients.len(),
            snapshot.accounts.len(),
            snapshot.transactions.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Write to a temp file next to `path`, then rename over it
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&temp_path, path)?;

        log::info!(
            "Saved {} accounts, {} records to {}",
            self.accounts.len(),
            self.transactions.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::account::AccountType;
    use crate::engine::clients::NewClient;
    use crate::engine::clock::Clock;
    use crate::engine::transaction::{TransactionRequest, TransactionType};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_fields_default() {
        let snapshot = Snapshot::from_reader("{}".as_bytes()).unwrap();
        assert_eq!(snapshot, Snapshot::default());
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::load(dir.path().join("absent.json")).unwrap();
        assert!(snapshot.accounts.is_empty());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bank.json");

        Snapshot::default().save(&path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_restored_bank_stamps_after_newest_record() {
        let future = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        let engine = TransactionEngine::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryLedger::new()),
        )
        .with_clock(Arc::new(FixedClock(future)));
        let bank = Bank::new(engine, Arc::new(InMemoryClientDirectory::new()));
        let owner = bank
            .register_client(NewClient {
                last_name: "Durand".into(),
                ..NewClient::default()
            })
            .unwrap();
        let number = bank
            .open_account(AccountType::Savings, owner.id, dec!(10))
            .unwrap()
            .number()
            .clone();
        bank.execute(&TransactionRequest::deposit(number.clone(), dec!(5)))
            .unwrap();

        // The restored bank runs on the system clock, which is behind 2099
        let restored = Snapshot::capture(&bank)
            .unwrap()
            .into_bank(EngineConfig::default());
        restored
            .execute(&TransactionRequest::withdrawal(number.clone(), dec!(3)))
            .unwrap();

        let history = restored.history(&number).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].timestamp() > future);
        assert_eq!(history[0].transaction_type(), TransactionType::Withdrawal);
        assert_eq!(
            history[0].balance_after(),
            restored.account(&number).unwrap().unwrap().account.balance()
        );
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = Snapshot::from_reader("{ not json".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
