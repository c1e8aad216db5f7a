//! Basic example of using the `Bank`.
//!
//! Run with: `cargo run --example basic`

use bank_ledger::{export_history, AccountType, Bank, NewClient, TransactionRequest};
use rust_decimal_macros::dec;
use std::io::Cursor;

fn main() {
    // Initialize logger (optional, but shows what's happening)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Create a bank with one client and two accounts
    let bank = Bank::in_memory();
    let client = bank
        .register_client(NewClient {
            last_name: "Martin".into(),
            first_name: "Claire".into(),
            ..NewClient::default()
        })
        .expect("Failed to register client");
    let savings = bank
        .open_account(AccountType::Savings, client.id, dec!(100))
        .expect("Failed to open savings account")
        .number()
        .clone();
    let checking = bank
        .open_account(AccountType::Checking, client.id, dec!(0))
        .expect("Failed to open checking account")
        .number()
        .clone();

    // Single requests
    let outcome = bank
        .execute(&TransactionRequest::transfer(savings.clone(), checking.clone(), dec!(40)))
        .expect("Failed to execute transfer");
    println!("{}", outcome.message());

    let outcome = bank
        .execute(&TransactionRequest::withdrawal(checking.clone(), dec!(500)))
        .expect("Failed to execute withdrawal");
    println!("{}", outcome.message());

    // A CSV batch
    let transactions = format!(
        "type,account,amount,destination,description
deposit,{savings},250.0,,payday
withdrawal,{checking},15.5,,groceries
transfer,{checking},10,{savings},
withdrawal,{savings},0,,
"
    );
    let summary = bank
        .engine()
        .process_requests(Cursor::new(transactions))
        .expect("Failed to process transactions");
    println!("Batch: {} applied, {} rejected", summary.applied, summary.rejected);

    // Export results to stdout
    println!("\n=== Savings History ===");
    let history = bank.history(&savings).expect("Failed to read history");
    export_history(&history, std::io::stdout()).expect("Failed to export history");

    println!(
        "\nTotal balance: {}",
        bank.total_balance().expect("Failed to sum balances")
    );
}
