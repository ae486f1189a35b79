//! Integration tests for transaction history queries.

mod common;

use rust_decimal_macros::dec;
use tally_core::ledger::{TransactionEngine, TransactionKind};
use tally_db::entities::sea_orm_active_enums::AccountKind;
use tally_db::{SeaOrmLedgerStore, TransactionRepository};
use tally_shared::types::{PageRequest, TransactionId, UserId};

use common::{insert_account, insert_user, setup};

#[tokio::test]
async fn test_list_transactions_newest_first_with_totals() {
    let db = setup().await;
    let user = insert_user(&db, "Historian").await;
    let account = insert_account(&db, user, AccountKind::Checking, dec!(0), true).await;
    let engine = TransactionEngine::new(SeaOrmLedgerStore::new(db.clone()));

    let mut posted = Vec::new();
    for amount in [dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)] {
        posted.push(engine.deposit(account, amount).await.unwrap().transaction.id);
    }

    let repo = TransactionRepository::new(db.clone());
    let first = repo
        .list_transactions(&PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.pages, 3);
    let ids: Vec<_> = first.items.iter().map(|d| d.transaction.id).collect();
    assert_eq!(ids, vec![posted[4], posted[3]]);

    let last = repo
        .list_transactions(&PageRequest::new(3, 2))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].transaction.id, posted[0]);

    let beyond = repo
        .list_transactions(&PageRequest::new(9, 2))
        .await
        .unwrap();
    assert_eq!(beyond.total, 5);
    assert!(beyond.items.is_empty());
}

#[tokio::test]
async fn test_repeated_listing_is_identical() {
    let db = setup().await;
    let user = insert_user(&db, "Repeat").await;
    let a = insert_account(&db, user, AccountKind::Checking, dec!(100), true).await;
    let b = insert_account(&db, user, AccountKind::Savings, dec!(0), true).await;
    let engine = TransactionEngine::new(SeaOrmLedgerStore::new(db.clone()));
    engine.transfer(a, b, dec!(10)).await.unwrap();
    engine.withdraw(a, dec!(5)).await.unwrap();
    engine.deposit(b, dec!(7)).await.unwrap();

    let repo = TransactionRepository::new(db.clone());
    let request = PageRequest::default();
    let once = repo.list_transactions(&request).await.unwrap();
    let twice = repo.list_transactions(&request).await.unwrap();

    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_get_transaction_includes_accounts_and_owners() {
    let db = setup().await;
    let alice = insert_user(&db, "Alice").await;
    let bob = insert_user(&db, "Bob").await;
    let a = insert_account(&db, alice, AccountKind::Checking, dec!(100), true).await;
    let b = insert_account(&db, bob, AccountKind::Checking, dec!(0), true).await;
    let engine = TransactionEngine::new(SeaOrmLedgerStore::new(db.clone()));
    let transfer = engine.transfer(a, b, dec!(40)).await.unwrap();

    let repo = TransactionRepository::new(db.clone());
    let detail = repo
        .get_transaction(transfer.transaction.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(detail.transaction.kind, TransactionKind::Transfer);
    let source = detail.account.unwrap();
    assert_eq!(source.account.id, a);
    assert_eq!(source.user.unwrap().name, "Alice");
    let destination = detail.to_account.unwrap();
    assert_eq!(destination.account.id, b);
    assert_eq!(destination.user.unwrap().name, "Bob");

    assert!(repo
        .get_transaction(TransactionId::new())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_list_by_user_matches_either_side() {
    let db = setup().await;
    let alice = insert_user(&db, "Alice").await;
    let bob = insert_user(&db, "Bob").await;
    let carol = insert_user(&db, "Carol").await;
    let a = insert_account(&db, alice, AccountKind::Checking, dec!(100), true).await;
    let b = insert_account(&db, bob, AccountKind::Checking, dec!(100), true).await;
    let c = insert_account(&db, carol, AccountKind::Checking, dec!(100), true).await;
    let engine = TransactionEngine::new(SeaOrmLedgerStore::new(db.clone()));

    let outgoing = engine.transfer(a, b, dec!(10)).await.unwrap().transaction.id;
    let incoming = engine.transfer(c, a, dec!(20)).await.unwrap().transaction.id;
    engine.transfer(b, c, dec!(30)).await.unwrap();
    let own = engine.deposit(a, dec!(1)).await.unwrap().transaction.id;

    let repo = TransactionRepository::new(db.clone());
    let page = repo
        .list_transactions_by_user(alice, &PageRequest::default())
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    let ids: Vec<_> = page.items.iter().map(|d| d.transaction.id).collect();
    assert_eq!(ids, vec![own, incoming, outgoing]);
}

#[tokio::test]
async fn test_list_by_user_without_accounts_is_empty() {
    let db = setup().await;
    let repo = TransactionRepository::new(db.clone());

    let page = repo
        .list_transactions_by_user(UserId::new(), &PageRequest::default())
        .await
        .unwrap();

    assert_eq!(page.total, 0);
    assert_eq!(page.pages, 0);
    assert!(page.items.is_empty());
}
