//! Ledger engine module.
//!
//! This module contains the core banking ledger logic including:
//! - `TransactionEngine` - Validates and atomically applies deposits, withdrawals and transfers
//! - `AccountStore` / `Ledger` / `ClientDirectory` - Pluggable backends with in-memory implementations
//! - `Bank` - Account and client lifecycle, views, aggregates and statements
//! - `Snapshot` - JSON persistence of the in-memory state
//! - `Error` types - Infrastructure errors and transaction rejections

mod account;
mod bank;
mod clients;
mod clock;
mod config;
mod error;
mod ledger;
mod locks;
mod outcome;
mod snapshot;
mod store;
mod transaction;
mod transaction_engine;

pub use rust_decimal::Decimal;

pub use account::{Account, AccountNumber, AccountType};
pub use bank::{AccountCounts, AccountView, Bank, Statement};
pub use clients::{Client, ClientDirectory, ClientId, ClientUpdate, InMemoryClientDirectory, NewClient};
pub use clock::{Clock, SystemClock};
pub use config::{EngineConfig, SelfTransferPolicy};
pub use error::{Error, Rejection, RejectionKind, StoreError, TransactionError};
pub use ledger::{InMemoryLedger, Ledger};
pub use outcome::{BatchSummary, TransactionOutcome, TransactionResponse};
pub use snapshot::Snapshot;
pub use store::{AccountStore, InMemoryAccountStore};
pub use transaction::{TransactionId, TransactionRecord, TransactionRequest, TransactionRow, TransactionType};
pub use transaction_engine::{export_history, TransactionEngine};
