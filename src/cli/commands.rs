use std::path::PathBuf;

use bank_ledger::{AccountType, ClientId, Decimal, SelfTransferPolicy};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
pub(crate) use clap::Parser;
use clap::{Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "bank-ledger",
    author,
    version,
    about = "A small banking ledger",
    long_about = None,
    after_help = "OUTPUT:\n    Transactions print a JSON response, listings print JSON or CSV to stdout.\n    State is kept in the data file between runs:\n\n    bank-ledger --data-file bank.json deposit SAV-12345678-042 100.00"
)]
pub struct Args {
    /// Path to the JSON data file
    #[arg(
        long,
        value_name = "FILE",
        env = "BANK_LEDGER_DATA",
        default_value = "bank-ledger.json"
    )]
    pub data_file: PathBuf,

    /// How transfers to the same account are handled
    #[arg(
        long,
        value_enum,
        env = "BANK_LEDGER_SELF_TRANSFER",
        default_value = "allow"
    )]
    pub self_transfer: SelfTransferArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage clients
    #[command(subcommand)]
    Client(ClientCommand),

    /// Manage accounts
    #[command(subcommand)]
    Account(AccountCommand),

    /// Deposit money into an account
    Deposit {
        account: String,
        amount: Decimal,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Withdraw money from an account
    Withdraw {
        account: String,
        amount: Decimal,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Move money between two accounts
    Transfer {
        from: String,
        to: String,
        amount: Decimal,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Transaction history of one account as CSV, newest first
    History { account: String },

    /// Most recent transactions as CSV
    Recent {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Transactions within a time window as CSV
    Period {
        /// Start of the window (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_from)]
        from: DateTime<Utc>,
        /// End of the window, inclusive (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_to)]
        to: DateTime<Utc>,
    },

    /// Account statement over a time window as JSON
    Statement {
        account: String,
        #[arg(long, value_parser = parse_from)]
        from: DateTime<Utc>,
        #[arg(long, value_parser = parse_to)]
        to: DateTime<Utc>,
    },

    /// Run a CSV batch of transactions
    Import {
        /// CSV file with columns: type, account, amount, destination, description
        #[arg(value_name = "FILE")]
        input_file: PathBuf,
    },

    /// Total balance and number of accounts per type
    Summary,
}

#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// Register a new client
    Add {
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        first_name: String,
        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        nationality: String,
    },
    /// List all clients
    List,
    /// Search clients by last name, first name or email
    Search { term: String },
    /// Remove a client and close all of its accounts
    Remove { id: ClientId },
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Open an account for a client
    Open {
        /// Owner client ID
        owner: ClientId,
        #[arg(short = 't', long, value_enum, default_value = "checking")]
        account_type: AccountTypeArg,
        #[arg(short, long, default_value = "0")]
        balance: Decimal,
    },
    /// List accounts, optionally for one client
    List {
        #[arg(long)]
        owner: Option<ClientId>,
    },
    /// Show one account
    Show { account: String },
    /// Close an account and remove its transaction history
    Close { account: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AccountTypeArg {
    Savings,
    Checking,
}

impl From<AccountTypeArg> for AccountType {
    fn from(value: AccountTypeArg) -> Self {
        match value {
            AccountTypeArg::Savings => AccountType::Savings,
            AccountTypeArg::Checking => AccountType::Checking,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SelfTransferArg {
    Allow,
    Reject,
}

impl From<SelfTransferArg> for SelfTransferPolicy {
    fn from(value: SelfTransferArg) -> Self {
        match value {
            SelfTransferArg::Allow => SelfTransferPolicy::Allow,
            SelfTransferArg::Reject => SelfTransferPolicy::Reject,
        }
    }
}

/// A bare date starts at midnight
fn parse_from(value: &str) -> Result<DateTime<Utc>, String> {
    parse_instant(value, NaiveTime::MIN)
}

/// A bare date covers the whole day
fn parse_to(value: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);
    parse_instant(value, end_of_day)
}

fn parse_instant(value: &str, time: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(time).and_utc())
        .map_err(|_| format!("'{value}' is neither RFC 3339 nor YYYY-MM-DD"))
}
