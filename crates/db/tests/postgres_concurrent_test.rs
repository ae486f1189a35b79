//! Contention tests against a real PostgreSQL server.
//!
//! SQLite serializes writers on its own, so row locks and the ascending-id
//! lock order only face real interleaving here. Each test releases its tasks
//! together through a barrier. Tests skip when `DATABASE_URL` is not a
//! reachable Postgres database.

mod common;

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal_macros::dec;
use tally_core::ledger::{LedgerError, TransactionEngine};
use tally_db::SeaOrmLedgerStore;
use tally_db::entities::sea_orm_active_enums::AccountKind;
use tokio::sync::Barrier;

use common::{balance, insert_account, insert_user, setup_postgres};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_racing_withdrawals_never_overdraw() {
    let Some(db) = setup_postgres().await else {
        return;
    };
    let user = insert_user(&db, "Contended").await;
    let account = insert_account(&db, user, AccountKind::Checking, dec!(100), true).await;
    let engine = Arc::new(TransactionEngine::new(SeaOrmLedgerStore::new(db.clone())));
    let barrier = Arc::new(Barrier::new(2));

    let handles = (0..2).map(|_| {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            engine.withdraw(account, dec!(60)).await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
            .count(),
        1
    );
    assert_eq!(balance(&db, account).await, dec!(40));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_opposite_transfers_do_not_deadlock() {
    let Some(db) = setup_postgres().await else {
        return;
    };
    let user = insert_user(&db, "Juggler").await;
    let a = insert_account(&db, user, AccountKind::Checking, dec!(1000), true).await;
    let b = insert_account(&db, user, AccountKind::Savings, dec!(1000), true).await;
    let engine = Arc::new(TransactionEngine::new(SeaOrmLedgerStore::new(db.clone())));
    let tasks = 8;
    let barrier = Arc::new(Barrier::new(tasks));

    let handles = (0..tasks).map(|i| {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
        tokio::spawn(async move {
            barrier.wait().await;
            engine.transfer(from, to, dec!(25)).await
        })
    });
    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    // Four transfers each way cancel out.
    assert_eq!(balance(&db, a).await, dec!(1000));
    assert_eq!(balance(&db, b).await, dec!(1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_racing_refunds_apply_once() {
    let Some(db) = setup_postgres().await else {
        return;
    };
    let user = insert_user(&db, "Refunder").await;
    let a = insert_account(&db, user, AccountKind::Checking, dec!(500), true).await;
    let b = insert_account(&db, user, AccountKind::Savings, dec!(500), true).await;
    let engine = Arc::new(TransactionEngine::new(SeaOrmLedgerStore::new(db.clone())));
    let posted = engine.transfer(a, b, dec!(200)).await.unwrap();
    let transfer_id = posted.transaction.id;
    let barrier = Arc::new(Barrier::new(2));

    let handles = (0..2).map(|_| {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            engine.refund(transfer_id).await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::AlreadyRefunded(_))))
            .count(),
        1
    );
    assert_eq!(balance(&db, a).await, dec!(500));
    assert_eq!(balance(&db, b).await, dec!(500));
}
