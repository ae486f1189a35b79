//! Database seeder for Tally development and testing.
//!
//! Seeds demo users with a checking and a savings account each, then posts a
//! few movements between them so history endpoints have something to show.
//!
//! Usage: cargo run --bin seeder

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tally_core::ledger::{AccountKind, TransactionEngine};
use tally_db::{
    AccountRepository, CreateAccountInput, CreateUserInput, SeaOrmLedgerStore, UserRepository,
};
use tally_shared::AppConfig;
use tally_shared::config::LedgerConfig;
use tally_shared::types::{AccountId, PageRequest, UserId};

const DEMO_USERS: [&str; 3] = ["Alice Demo", "Bob Demo", "Carol Demo"];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().expect("Failed to load configuration");

    println!("Connecting to database...");
    let db = tally_db::connect(&config.database)
        .await
        .expect("Failed to connect to database");

    let users = UserRepository::new(db.clone());
    let existing = users
        .list_users(&PageRequest::new(1, 1))
        .await
        .expect("Failed to count users");
    if existing.total > 0 {
        println!("  Database already has {} users, skipping...", existing.total);
        return;
    }

    println!("Seeding users and accounts...");
    let mut checking = Vec::new();
    for name in DEMO_USERS {
        let Some(user_id) = seed_user(&users, name).await else {
            continue;
        };
        let accounts = AccountRepository::new(db.clone(), config.ledger);
        if let Some(id) = seed_account(&accounts, &config.ledger, user_id, AccountKind::Checking).await {
            checking.push(id);
        }
        seed_account(&accounts, &config.ledger, user_id, AccountKind::Savings).await;
    }

    println!("Seeding transactions...");
    seed_transactions(&db, &checking).await;

    println!("Seeding complete!");
}

async fn seed_user(users: &UserRepository, name: &str) -> Option<UserId> {
    match users
        .create_user(CreateUserInput {
            name: name.to_string(),
        })
        .await
    {
        Ok(user) => {
            println!("  Created user: {name}");
            Some(UserId::from_uuid(user.id))
        }
        Err(e) => {
            eprintln!("Failed to insert user {name}: {e}");
            None
        }
    }
}

async fn seed_account(
    accounts: &AccountRepository,
    limits: &LedgerConfig,
    user_id: UserId,
    kind: AccountKind,
) -> Option<AccountId> {
    let input = CreateAccountInput {
        user_id,
        kind,
        balance: Decimal::from(limits.min_opening_balance) * Decimal::from(2),
        active: true,
    };
    match accounts.create_account(input).await {
        Ok(account) => {
            println!("  Opened {kind} account {}", account.account_number);
            Some(account.id)
        }
        Err(e) => {
            eprintln!("Failed to open {kind} account: {e}");
            None
        }
    }
}

/// Posts a deposit, a withdrawal and a ring of transfers across `accounts`.
async fn seed_transactions(db: &DatabaseConnection, accounts: &[AccountId]) {
    let engine = TransactionEngine::new(SeaOrmLedgerStore::new(db.clone()));
    let mut posted = 0;

    for (i, from) in accounts.iter().enumerate() {
        let to = accounts[(i + 1) % accounts.len()];
        let results = [
            engine.deposit(*from, Decimal::new(25_000, 2)).await.map(|_| ()),
            engine.withdraw(*from, Decimal::new(4_250, 2)).await.map(|_| ()),
            engine.transfer(*from, to, Decimal::new(10_000, 2)).await.map(|_| ()),
        ];
        for result in results {
            match result {
                Ok(()) => posted += 1,
                Err(e) => eprintln!("Failed to post transaction: {e}"),
            }
        }
    }

    println!("  Posted {posted} transactions");
}
