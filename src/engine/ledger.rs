use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::account::AccountNumber;
use super::error::StoreError;
use super::transaction::TransactionRecord;

/// Append-only history of transaction records.
///
/// Every query returns records newest first. Records with equal timestamps
/// keep their insertion order.
pub trait Ledger: Send + Sync {
    fn append(&self, record: TransactionRecord) -> Result<(), StoreError>;

    /// Records where `account` is the primary account or the counterparty
    fn by_account(&self, account: &AccountNumber) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Records with `start <= timestamp <= end`
    fn by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// The `limit` most recent records across all accounts
    fn recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Drop every record involving `account`. Only used when an account is
    /// closed; returns how many records were removed.
    fn purge_account(&self, account: &AccountNumber) -> Result<usize, StoreError>;

    /// Every record, in insertion order
    fn all(&self) -> Result<Vec<TransactionRecord>, StoreError>;
}

/// Sort newest first. `sort_by` is stable, so equal timestamps stay in
/// insertion order.
fn newest_first(mut records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
    records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    records
}

/// Ledger kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: RwLock<Vec<TransactionRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a ledger from previously persisted records (insertion order)
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    fn filtered<F>(&self, predicate: F) -> Result<Vec<TransactionRecord>, StoreError>
    where
        F: Fn(&TransactionRecord) -> bool,
    {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(newest_first(
            records.iter().filter(|r| predicate(r)).cloned().collect(),
        ))
    }
}

impl Ledger for InMemoryLedger {
    fn append(&self, record: TransactionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        log::trace!("[ledger] append {record}");
        records.push(record);
        Ok(())
    }

    fn by_account(&self, account: &AccountNumber) -> Result<Vec<TransactionRecord>, StoreError> {
        self.filtered(|r| r.involves(account))
    }

    fn by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.filtered(|r| start <= r.timestamp() && r.timestamp() <= end)
    }

    fn recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut records = self.filtered(|_| true)?;
        records.truncate(limit);
        Ok(records)
    }

    fn purge_account(&self, account: &AccountNumber) -> Result<usize, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let before = records.len();
        records.retain(|r| !r.involves(account));
        let removed = before - records.len();
        log::debug!("[ledger] purged {removed} records of account {account}");
        Ok(removed)
    }

    fn all(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.clone())
    }
}
