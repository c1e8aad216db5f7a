use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use super::account::{Account, AccountNumber};
use super::clock::{Clock, Stamper, SystemClock};
use super::config::{EngineConfig, SelfTransferPolicy};
use super::error::{Error, Rejection};
use super::ledger::Ledger;
use super::locks::AccountLocks;
use super::outcome::{BatchSummary, TransactionOutcome};
use super::store::AccountStore;
use super::transaction::{TransactionRecord, TransactionRequest, TransactionRow, TransactionType};
use super::Decimal;

/// The core transaction engine.
///
/// Validates deposit, withdrawal and transfer requests and applies them
/// atomically against an [`AccountStore`] and a [`Ledger`]. The engine
/// keeps no balances of its own. Each `execute` call locks the accounts it
/// touches, re-reads their current state, validates, and then mutates.
pub struct TransactionEngine<S, L> {
    accounts: Arc<S>,
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    locks: AccountLocks,
    stamper: Stamper,
    subscribers: Mutex<Vec<Sender<TransactionRecord>>>,
}

/// A balance replacement the engine has decided on, kept for rollback.
struct BalanceChange<'a> {
    account: &'a AccountNumber,
    before: Decimal,
    after: Decimal,
}

impl<S: AccountStore, L: Ledger> TransactionEngine<S, L> {
    /// Create an engine over the given store and ledger with default settings
    pub fn new(accounts: Arc<S>, ledger: Arc<L>) -> Self {
        Self::with_config(accounts, ledger, EngineConfig::default())
    }

    pub fn with_config(accounts: Arc<S>, ledger: Arc<L>, config: EngineConfig) -> Self {
        log::trace!("TransactionEngine initialized with {config:?}");
        Self {
            accounts,
            ledger,
            clock: Arc::new(SystemClock),
            config,
            locks: AccountLocks::new(),
            stamper: Stamper::default(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Replace the time source used to stamp records
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stamp new records strictly after `last`, the newest timestamp of a
    /// restored ledger
    #[must_use]
    pub(crate) fn resuming_after(mut self, last: Option<DateTime<Utc>>) -> Self {
        self.stamper = Stamper::resume_after(last);
        self
    }

    pub fn accounts(&self) -> &Arc<S> {
        &self.accounts
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn locks(&self) -> &AccountLocks {
        &self.locks
    }

    /// Primary API: validate and apply one request.
    ///
    /// Business rule violations come back as `Ok(TransactionOutcome::Rejected)`.
    /// `Err` is reserved for backend failures, and in that case every balance
    /// already replaced by this call has been restored.
    pub fn execute(&self, request: &TransactionRequest) -> Result<TransactionOutcome, Error> {
        log::trace!(
            "Executing {} on {} amount={} destination={:?}",
            request.transaction_type,
            request.account_number,
            request.amount,
            request.destination_account
        );

        let mut involved = vec![&request.account_number];
        if request.transaction_type == TransactionType::Transfer {
            if let Some(destination) = &request.destination_account {
                involved.push(destination);
            }
        }

        let outcome = self.locks.with_locked(&involved, || {
            let outcome = self.apply(request)?;
            if let TransactionOutcome::Applied(record) = &outcome {
                self.publish(record)?;
            }
            Ok::<_, Error>(outcome)
        })??;

        match &outcome {
            TransactionOutcome::Applied(record) => log::trace!("Applied {record}"),
            TransactionOutcome::Rejected(rejection) => {
                log::debug!("Rejected {}: {rejection}", request.transaction_type);
            }
        }
        Ok(outcome)
    }

    /// Batch API: run CSV transaction requests from any source (File, `TcpStream`, etc.)
    ///
    /// Expected columns: `type, account, amount, destination, description`.
    /// Malformed rows abort the batch. Rejected requests are logged and skipped.
    /// Note that the CSV reader is buffered automatically, so you should not wrap rdr in a buffered reader like `io::BufReader`.
    pub fn process_requests<R: Read>(&self, reader: R) -> Result<BatchSummary, Error> {
        log::info!("Starting batch processing");

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut summary = BatchSummary::default();

        for result in csv_reader.deserialize() {
            // Step 1: Parse CSV row into raw TransactionRow
            let row: TransactionRow = result?;

            let row_num = summary.applied + summary.rejected + 1;
            log::trace!("[row {row_num}] Parsing: {row}");

            // Step 2: Convert raw TransactionRow into a TransactionRequest
            let request = TransactionRequest::try_from(row)?;

            // Step 3: Execute the request
            match self.execute(&request)? {
                TransactionOutcome::Applied(_) => summary.applied += 1,
                TransactionOutcome::Rejected(rejection) => {
                    log::warn!("[row {row_num}] - Skipped: {rejection}");
                    summary.rejected += 1;
                }
            }
        }

        log::info!(
            "Batch complete: {} applied, {} rejected",
            summary.applied,
            summary.rejected
        );
        Ok(summary)
    }

    /// Receive every record applied from now on.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Result<Receiver<TransactionRecord>, Error> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .push(sender);
        Ok(receiver)
    }

    /// Newest-first history of `account` as primary or counterparty
    pub fn history(&self, account: &AccountNumber) -> Result<Vec<TransactionRecord>, Error> {
        Ok(self.ledger.by_account(account)?)
    }

    fn apply(&self, request: &TransactionRequest) -> Result<TransactionOutcome, Error> {
        // Step 1: Resolve the primary account
        let Some(account) = self.accounts.find_by_number(&request.account_number)? else {
            return Ok(TransactionOutcome::Rejected(Rejection::AccountNotFound {
                account: request.account_number.clone(),
            }));
        };

        // Step 2: Amount must be strictly positive
        if request.amount <= Decimal::ZERO {
            return Ok(TransactionOutcome::Rejected(Rejection::InvalidAmount {
                amount: request.amount,
            }));
        }

        // Step 3: Per-type checks and effects
        match request.transaction_type {
            TransactionType::Deposit => self.handle_deposit(&account, request),
            TransactionType::Withdrawal => self.handle_withdrawal(&account, request),
            TransactionType::Transfer => self.handle_transfer(&account, request),
        }
    }

    fn publish(&self, record: &TransactionRecord) -> Result<(), Error> {
        let mut subscribers = self.subscribers.lock().map_err(|_| Error::LockPoisoned)?;
        subscribers.retain(|sender| sender.send(record.clone()).is_ok());
        Ok(())
    }
}

// =============================================================================
// Transaction Handlers
// =============================================================================

impl<S: AccountStore, L: Ledger> TransactionEngine<S, L> {
    fn handle_deposit(
        &self,
        account: &Account,
        request: &TransactionRequest,
    ) -> Result<TransactionOutcome, Error> {
        let amount = request.amount;
        let Some(new_balance) = account.balance().checked_add(amount) else {
            return Ok(TransactionOutcome::Rejected(overflow(account, amount)));
        };

        log::trace!(
            "[deposit] account={} amount={} -> new_balance={}",
            account.number(),
            amount,
            new_balance
        );

        let record = TransactionRecord::new(
            account.number().clone(),
            TransactionType::Deposit,
            amount,
            self.stamper.next(self.clock.as_ref())?,
            describe(request, || format!("Deposit of {amount:.2}")),
            new_balance,
            None,
        );
        self.commit(
            &[BalanceChange {
                account: account.number(),
                before: account.balance(),
                after: new_balance,
            }],
            record,
        )
    }

    fn handle_withdrawal(
        &self,
        account: &Account,
        request: &TransactionRequest,
    ) -> Result<TransactionOutcome, Error> {
        let amount = request.amount;

        if account.balance() < amount {
            return Ok(TransactionOutcome::Rejected(Rejection::InsufficientFunds {
                account: account.number().clone(),
                available: account.balance(),
                requested: amount,
            }));
        }

        let new_balance = account.balance() - amount;

        log::trace!(
            "[withdrawal] account={} amount={} -> new_balance={}",
            account.number(),
            amount,
            new_balance
        );

        let record = TransactionRecord::new(
            account.number().clone(),
            TransactionType::Withdrawal,
            amount,
            self.stamper.next(self.clock.as_ref())?,
            describe(request, || format!("Withdrawal of {amount:.2}")),
            new_balance,
            None,
        );
        self.commit(
            &[BalanceChange {
                account: account.number(),
                before: account.balance(),
                after: new_balance,
            }],
            record,
        )
    }

    fn handle_transfer(
        &self,
        source: &Account,
        request: &TransactionRequest,
    ) -> Result<TransactionOutcome, Error> {
        let amount = request.amount;

        let Some(destination_number) = &request.destination_account else {
            return Ok(TransactionOutcome::Rejected(Rejection::MissingDestination));
        };

        if source.balance() < amount {
            return Ok(TransactionOutcome::Rejected(Rejection::InsufficientFunds {
                account: source.number().clone(),
                available: source.balance(),
                requested: amount,
            }));
        }

        let Some(destination) = self.accounts.find_by_number(destination_number)? else {
            return Ok(TransactionOutcome::Rejected(Rejection::DestinationNotFound {
                account: destination_number.clone(),
            }));
        };

        let self_transfer = destination.number() == source.number();
        if self_transfer && self.config.self_transfer == SelfTransferPolicy::Reject {
            return Ok(TransactionOutcome::Rejected(Rejection::SelfTransfer {
                account: source.number().clone(),
            }));
        }

        let (source_new, changes) = if self_transfer {
            (source.balance(), Vec::new())
        } else {
            let Some(destination_new) = destination.balance().checked_add(amount) else {
                return Ok(TransactionOutcome::Rejected(overflow(&destination, amount)));
            };
            let source_new = source.balance() - amount;
            let changes = vec![
                BalanceChange {
                    account: source.number(),
                    before: source.balance(),
                    after: source_new,
                },
                BalanceChange {
                    account: destination.number(),
                    before: destination.balance(),
                    after: destination_new,
                },
            ];
            (source_new, changes)
        };

        log::trace!(
            "[transfer] source={} destination={} amount={} -> source_balance={}",
            source.number(),
            destination.number(),
            amount,
            source_new
        );

        let record = TransactionRecord::new(
            source.number().clone(),
            TransactionType::Transfer,
            amount,
            self.stamper.next(self.clock.as_ref())?,
            describe(request, || format!("Transfer to {destination_number}")),
            source_new,
            Some(destination_number.clone()),
        );
        self.commit(&changes, record)
    }

    /// Apply balance changes in order, then append the record. On any
    /// backend failure, restore the balances already replaced.
    fn commit(
        &self,
        changes: &[BalanceChange<'_>],
        record: TransactionRecord,
    ) -> Result<TransactionOutcome, Error> {
        for (applied, change) in changes.iter().enumerate() {
            if let Err(err) = self.accounts.update_balance(change.account, change.after) {
                self.roll_back(&changes[..applied]);
                return Err(err.into());
            }
        }

        if let Err(err) = self.ledger.append(record.clone()) {
            self.roll_back(changes);
            return Err(err.into());
        }

        Ok(TransactionOutcome::Applied(record))
    }

    fn roll_back(&self, applied: &[BalanceChange<'_>]) {
        for change in applied.iter().rev() {
            if let Err(err) = self.accounts.update_balance(change.account, change.before) {
                log::error!(
                    "Rollback of account {} to {} failed: {err}",
                    change.account,
                    change.before
                );
            }
        }
    }
}

fn overflow(account: &Account, amount: Decimal) -> Rejection {
    Rejection::BalanceOverflow {
        account: account.number().clone(),
        balance: account.balance(),
        amount,
    }
}

/// Caller-supplied description, or the generated default when absent or blank
fn describe(request: &TransactionRequest, default: impl FnOnce() -> String) -> String {
    request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map_or_else(default, str::to_owned)
}

// =============================================================================
// History Export
// =============================================================================

/// Serialize Decimal with exactly 2 decimal places
fn serialize_decimal_2dp<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.2}"))
}

fn serialize_rfc3339<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Serialize)]
struct HistoryRow<'a> {
    id: String,
    account: &'a AccountNumber,
    #[serde(rename = "type")]
    tx_type: TransactionType,
    #[serde(serialize_with = "serialize_decimal_2dp")]
    amount: Decimal,
    #[serde(serialize_with = "serialize_rfc3339")]
    timestamp: DateTime<Utc>,
    description: &'a str,
    #[serde(serialize_with = "serialize_decimal_2dp")]
    balance_after: Decimal,
    counterparty: Option<&'a AccountNumber>,
}

/// Write records to any sink (Stdout, File, `TcpStream`, etc.) as CSV.
/// Note that the CSV writer is buffered automatically, so you should not wrap wtr in a buffered writer like `io::BufWriter`.
pub fn export_history<W: Write>(records: &[TransactionRecord], writer: W) -> Result<(), Error> {
    log::info!("Exporting {} records", records.len());

    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(HistoryRow {
            id: record.id().to_string(),
            account: record.account_number(),
            tx_type: record.transaction_type(),
            amount: record.amount(),
            timestamp: record.timestamp(),
            description: record.description(),
            balance_after: record.balance_after(),
            counterparty: record.counterparty_account(),
        })?;
    }
    csv_writer.flush()?;

    log::trace!("Export complete");
    Ok(())
}
