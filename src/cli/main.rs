mod commands;

use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use bank_ledger::{
    export_history, AccountNumber, Bank, EngineConfig, NewClient, Snapshot, TransactionRequest,
    TransactionResponse,
};
use clap::Parser;
use commands::{AccountCommand, Args, ClientCommand, Command};
use serde::Serialize;

fn main() -> Result<()> {
    // Parse the CLI arguments
    let args = Args::parse();

    // Initialize logger with default level of info (can be overridden with RUST_LOG)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 1. Restore the bank from the data file
    let config = EngineConfig::default().with_self_transfer(args.self_transfer.into());
    let bank = Snapshot::load(&args.data_file)
        .with_context(|| format!("Failed to load data file: {}", args.data_file.display()))?
        .into_bank(config);

    // 2. Run the command
    let mutated = run(&bank, args.command)?;

    // 3. Persist if anything changed
    if mutated {
        Snapshot::capture(&bank)
            .context("Failed to capture ledger state")?
            .save(&args.data_file)
            .with_context(|| format!("Failed to save data file: {}", args.data_file.display()))?;
    }

    Ok(())
}

/// Dispatch one command. Returns whether the state changed.
fn run(bank: &Bank, command: Command) -> Result<bool> {
    match command {
        Command::Client(command) => run_client(bank, command),
        Command::Account(command) => run_account(bank, command),
        Command::Deposit {
            account,
            amount,
            description,
        } => submit(bank, TransactionRequest::deposit(account, amount), description),
        Command::Withdraw {
            account,
            amount,
            description,
        } => submit(
            bank,
            TransactionRequest::withdrawal(account, amount),
            description,
        ),
        Command::Transfer {
            from,
            to,
            amount,
            description,
        } => submit(
            bank,
            TransactionRequest::transfer(from, to, amount),
            description,
        ),
        Command::History { account } => {
            let records = bank.history(&AccountNumber::from(account))?;
            export_history(&records, io::stdout()).context("Failed to export history")?;
            Ok(false)
        }
        Command::Recent { limit } => {
            export_history(&bank.recent(limit)?, io::stdout())
                .context("Failed to export history")?;
            Ok(false)
        }
        Command::Period { from, to } => {
            export_history(&bank.by_period(from, to)?, io::stdout())
                .context("Failed to export history")?;
            Ok(false)
        }
        Command::Statement { account, from, to } => {
            let number = AccountNumber::from(account);
            let statement = bank
                .statement(&number, from, to)?
                .ok_or_else(|| anyhow!("Account {number} not found"))?;
            print_json(&statement)?;
            Ok(false)
        }
        Command::Import { input_file } => {
            log::info!("Processing transactions from {}", input_file.display());
            let file = std::fs::File::open(&input_file).with_context(|| {
                format!("Failed to open input file: {}", input_file.display())
            })?;
            let summary = bank
                .engine()
                .process_requests(file)
                .context("Failed to process transactions")?;
            print_json(&summary)?;
            Ok(summary.applied > 0)
        }
        Command::Summary => {
            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            struct Summary {
                total_balance: bank_ledger::Decimal,
                accounts: bank_ledger::AccountCounts,
            }
            print_json(&Summary {
                total_balance: bank.total_balance()?,
                accounts: bank.account_counts()?,
            })?;
            Ok(false)
        }
    }
}

fn run_client(bank: &Bank, command: ClientCommand) -> Result<bool> {
    match command {
        ClientCommand::Add {
            last_name,
            first_name,
            birth_date,
            address,
            phone,
            email,
            nationality,
        } => {
            let client = bank.register_client(NewClient {
                last_name,
                first_name,
                birth_date,
                address,
                phone,
                email,
                nationality,
            })?;
            print_json(&client)?;
            Ok(true)
        }
        ClientCommand::List => {
            print_json(&bank.all_clients()?)?;
            Ok(false)
        }
        ClientCommand::Search { term } => {
            print_json(&bank.search_clients(&term)?)?;
            Ok(false)
        }
        ClientCommand::Remove { id } => {
            let closed = bank.remove_client(&id)?;
            log::info!("Removed client {id}, {closed} accounts closed");
            Ok(true)
        }
    }
}

fn run_account(bank: &Bank, command: AccountCommand) -> Result<bool> {
    match command {
        AccountCommand::Open {
            owner,
            account_type,
            balance,
        } => {
            let account = bank.open_account(account_type.into(), owner, balance)?;
            print_json(&account)?;
            Ok(true)
        }
        AccountCommand::List { owner } => {
            let accounts = match owner {
                Some(owner) => bank.accounts_of(&owner)?,
                None => bank.accounts()?,
            };
            print_json(&accounts)?;
            Ok(false)
        }
        AccountCommand::Show { account } => {
            let number = AccountNumber::from(account);
            let view = bank
                .account(&number)?
                .ok_or_else(|| anyhow!("Account {number} not found"))?;
            print_json(&view)?;
            Ok(false)
        }
        AccountCommand::Close { account } => {
            let number = AccountNumber::from(account);
            let purged = bank.close_account(&number)?;
            log::info!("Closed account {number}, {purged} records removed");
            Ok(true)
        }
    }
}

fn submit(bank: &Bank, request: TransactionRequest, description: Option<String>) -> Result<bool> {
    let request = match description {
        Some(description) => request.with_description(description),
        None => request,
    };
    let response = TransactionResponse::from(bank.execute(&request)?);
    let applied = response.success;
    print_json(&response)?;
    Ok(applied)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("Failed to write JSON to stdout")?;
    writeln!(stdout)?;
    Ok(())
}
