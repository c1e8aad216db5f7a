//! Ledger invariants over random operation sequences.
use bank_ledger::{AccountNumber, AccountType, Bank, Decimal, NewClient, TransactionRequest};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Deposit(usize, i64),
    Withdraw(usize, i64),
    Transfer(usize, usize, i64),
}

const ACCOUNTS: usize = 3;

fn op() -> impl Strategy<Value = Op> {
    // Amounts in cents, zero included so invalid amounts are exercised too
    let amount = 0i64..50_000;
    prop_oneof![
        (0..ACCOUNTS, amount.clone()).prop_map(|(a, cents)| Op::Deposit(a, cents)),
        (0..ACCOUNTS, amount.clone()).prop_map(|(a, cents)| Op::Withdraw(a, cents)),
        (0..ACCOUNTS, 0..ACCOUNTS, amount).prop_map(|(a, b, cents)| Op::Transfer(a, b, cents)),
    ]
}

fn setup(opening: &[i64]) -> (Bank, Vec<AccountNumber>) {
    let bank = Bank::in_memory();
    let owner = bank
        .register_client(NewClient {
            last_name: "Prop".into(),
            first_name: "Test".into(),
            ..NewClient::default()
        })
        .unwrap();
    let numbers = opening
        .iter()
        .map(|cents| {
            bank.open_account(AccountType::Savings, owner.id, Decimal::new(*cents, 2))
                .unwrap()
                .number()
                .clone()
        })
        .collect();
    (bank, numbers)
}

fn request(op: &Op, accounts: &[AccountNumber]) -> TransactionRequest {
    match *op {
        Op::Deposit(a, cents) => TransactionRequest::deposit(accounts[a].clone(), Decimal::new(cents, 2)),
        Op::Withdraw(a, cents) => {
            TransactionRequest::withdrawal(accounts[a].clone(), Decimal::new(cents, 2))
        }
        Op::Transfer(a, b, cents) => TransactionRequest::transfer(
            accounts[a].clone(),
            accounts[b].clone(),
            Decimal::new(cents, 2),
        ),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// Property: balances never go negative, the record's balance after
    /// matches the stored balance, and only deposits and withdrawals move
    /// the total.
    #[test]
    fn ledger_invariants_hold(
        opening in prop::collection::vec(0i64..100_000, ACCOUNTS),
        ops in prop::collection::vec(op(), 1..40)
    ) {
        let (bank, accounts) = setup(&opening);
        let mut expected_total = bank.total_balance().unwrap();

        for op in &ops {
            let outcome = bank.execute(&request(op, &accounts)).unwrap();

            if let Some(record) = outcome.record() {
                let stored = bank.account(record.account_number()).unwrap().unwrap();
                prop_assert_eq!(record.balance_after(), stored.account.balance());
                prop_assert!(record.amount() > Decimal::ZERO);

                match op {
                    Op::Deposit(..) => expected_total += record.amount(),
                    Op::Withdraw(..) => expected_total -= record.amount(),
                    Op::Transfer(..) => {}
                }
            }

            for number in &accounts {
                let view = bank.account(number).unwrap().unwrap();
                prop_assert!(view.account.balance() >= Decimal::ZERO);
            }
            prop_assert_eq!(bank.total_balance().unwrap(), expected_total);
        }
    }

    /// Property: a rejected request leaves balances and the ledger as they were.
    #[test]
    fn rejections_change_nothing(
        opening in prop::collection::vec(0i64..10_000, ACCOUNTS),
        ops in prop::collection::vec(op(), 1..40)
    ) {
        let (bank, accounts) = setup(&opening);

        for op in &ops {
            let before_balances: Vec<_> = accounts
                .iter()
                .map(|n| bank.account(n).unwrap().unwrap().account.balance())
                .collect();
            let before_records = bank.recent(usize::MAX).unwrap().len();

            let outcome = bank.execute(&request(op, &accounts)).unwrap();

            if !outcome.is_success() {
                let after_balances: Vec<_> = accounts
                    .iter()
                    .map(|n| bank.account(n).unwrap().unwrap().account.balance())
                    .collect();
                prop_assert_eq!(before_balances, after_balances);
                prop_assert_eq!(bank.recent(usize::MAX).unwrap().len(), before_records);
            }
        }
    }
}
