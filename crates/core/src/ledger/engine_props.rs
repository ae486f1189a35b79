//! Property-based tests for the transaction engine.
//!
//! - Balances never go negative, whatever sequence of operations runs.
//! - Money is conserved: total balance moves only by deposits and withdrawals.
//! - A transfer followed by its refund restores both balances exactly.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TransactionId, UserId};

use super::engine::TransactionEngine;
use super::error::LedgerError;
use super::memory::MemoryLedgerStore;
use super::types::{Account, AccountKind, TransactionKind};

const ACCOUNTS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Deposit { to: usize, amount: Decimal },
    Withdraw { from: usize, amount: Decimal },
    Transfer { from: usize, to: usize, amount: Decimal },
    RefundLatest,
}

/// Strategy to generate amounts from 0.01 to 1,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ACCOUNTS, amount()).prop_map(|(to, amount)| Op::Deposit { to, amount }),
        (0..ACCOUNTS, amount()).prop_map(|(from, amount)| Op::Withdraw { from, amount }),
        (0..ACCOUNTS, 0..ACCOUNTS, amount())
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        Just(Op::RefundLatest),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn open_accounts(store: &MemoryLedgerStore, balances: &[Decimal]) -> Vec<AccountId> {
    let owner = UserId::new();
    let mut ids = Vec::with_capacity(balances.len());
    for (i, balance) in balances.iter().enumerate() {
        let now = Utc::now();
        let id = AccountId::new();
        store
            .put_account(Account {
                id,
                user_id: owner,
                account_number: format!("30000000{i:02}"),
                kind: AccountKind::Checking,
                balance: *balance,
                active: true,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await;
        ids.push(id);
    }
    ids
}

async fn total(store: &MemoryLedgerStore, ids: &[AccountId]) -> Decimal {
    let mut sum = Decimal::ZERO;
    for id in ids {
        sum += store.account(*id).await.unwrap().balance;
    }
    sum
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_balances_stay_non_negative_and_money_is_conserved(
        initial in prop::collection::vec(0i64..50_000i64, ACCOUNTS),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        runtime().block_on(async {
            let store = MemoryLedgerStore::new();
            let balances: Vec<_> = initial.iter().map(|c| Decimal::new(*c, 2)).collect();
            let ids = open_accounts(&store, &balances).await;
            let engine = TransactionEngine::new(store.clone());

            let mut expected = balances.iter().copied().sum::<Decimal>();
            let mut transfers: Vec<TransactionId> = Vec::new();

            for op in ops {
                match op {
                    Op::Deposit { to, amount } => {
                        engine.deposit(ids[to], amount).await.unwrap();
                        expected += amount;
                    }
                    Op::Withdraw { from, amount } => {
                        match engine.withdraw(ids[from], amount).await {
                            Ok(_) => expected -= amount,
                            Err(err) => {
                                prop_assert!(
                                    matches!(err, LedgerError::InsufficientFunds { .. }),
                                    "unexpected error: {err:?}"
                                );
                            }
                        }
                    }
                    Op::Transfer { from, to, amount } => {
                        match engine.transfer(ids[from], ids[to], amount).await {
                            Ok(posted) => transfers.push(posted.transaction.id),
                            Err(err) => {
                                prop_assert!(
                                    matches!(
                                        err,
                                        LedgerError::InsufficientFunds { .. }
                                            | LedgerError::SameAccountTransfer(_)
                                    ),
                                    "unexpected error: {err:?}"
                                );
                            }
                        }
                    }
                    Op::RefundLatest => {
                        if let Some(id) = transfers.pop() {
                            // Either reversed, or the destination already spent the money.
                            if let Err(err) = engine.refund(id).await {
                                prop_assert!(
                                    matches!(err, LedgerError::InsufficientFunds { .. }),
                                    "unexpected error: {err:?}"
                                );
                            }
                        }
                    }
                }

                for id in &ids {
                    prop_assert!(store.account(*id).await.unwrap().balance >= Decimal::ZERO);
                }
                prop_assert_eq!(total(&store, &ids).await, expected);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_transfer_then_refund_restores_balances(
        source in 0i64..100_000i64,
        destination in 0i64..100_000i64,
        amount in amount(),
    ) {
        let source = Decimal::new(source, 2);
        let destination = Decimal::new(destination, 2);
        prop_assume!(amount <= source);

        runtime().block_on(async {
            let store = MemoryLedgerStore::new();
            let ids = open_accounts(&store, &[source, destination]).await;
            let engine = TransactionEngine::new(store.clone());

            let transfer = engine.transfer(ids[0], ids[1], amount).await.unwrap();
            prop_assert_eq!(transfer.transaction.kind, TransactionKind::Transfer);
            engine.refund(transfer.transaction.id).await.unwrap();

            prop_assert_eq!(store.account(ids[0]).await.unwrap().balance, source);
            prop_assert_eq!(store.account(ids[1]).await.unwrap().balance, destination);
            prop_assert!(store.transaction(transfer.transaction.id).await.unwrap().refunded);
            Ok(())
        })?;
    }
}
