//! A small banking ledger.
//!
//! Clients own accounts; accounts change only through the [`TransactionEngine`],
//! which applies deposits, withdrawals and transfers atomically and files an
//! immutable record for each one in the [`Ledger`].

pub mod engine;

pub use engine::{
    export_history, Account, AccountCounts, AccountNumber, AccountStore, AccountType,
    AccountView, Bank, BatchSummary, Client, ClientDirectory, ClientId, ClientUpdate, Clock,
    Decimal, EngineConfig, Error, InMemoryAccountStore, InMemoryClientDirectory, InMemoryLedger,
    Ledger, NewClient, Rejection, RejectionKind, SelfTransferPolicy, Snapshot, Statement,
    StoreError, SystemClock, TransactionEngine, TransactionError, TransactionId,
    TransactionOutcome, TransactionRecord, TransactionRequest, TransactionResponse,
    TransactionRow, TransactionType,
};
