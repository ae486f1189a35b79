//! Shared fixtures for database integration tests.
//!
//! Every test gets a private in-memory SQLite database migrated with the
//! production migrator. The pool holds a single connection so the database
//! lives as long as the pool.
//!
//! [`setup_postgres`] connects to the server named by `DATABASE_URL` (or
//! `TALLY__DATABASE__URL`) instead, and returns `None` when none is reachable.

#![allow(dead_code)]

use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tally_db::entities::{accounts, sea_orm_active_enums::AccountKind, users};
use tally_db::migration::{Migrator, MigratorTrait};
use tally_shared::config::DatabaseConfig;
use tally_shared::types::{AccountId, UserId};
use uuid::Uuid;

pub async fn setup() -> DatabaseConnection {
    let config = DatabaseConfig {
        max_connections: 1,
        min_connections: 1,
        ..DatabaseConfig::with_url("sqlite::memory:")
    };
    let db = tally_db::connect(&config)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Serializes migrations when several tests share one Postgres database.
static MIGRATIONS: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

fn postgres_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("TALLY__DATABASE__URL"))
        .ok()
        .filter(|url| url.starts_with("postgres"))
}

pub async fn setup_postgres() -> Option<DatabaseConnection> {
    let Some(url) = postgres_url() else {
        eprintln!("Skipping test - DATABASE_URL does not name a Postgres database");
        return None;
    };
    let db = match tally_db::connect(&DatabaseConfig::with_url(url)).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Skipping test - database not available: {e}");
            return None;
        }
    };
    let _guard = MIGRATIONS.lock().await;
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    Some(db)
}

pub async fn insert_user(db: &DatabaseConnection, name: &str) -> UserId {
    let now = chrono::Utc::now().fixed_offset();
    let user = users::ActiveModel {
        id: Set(Uuid::now_v7()),
        name: Set(name.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(db)
    .await
    .expect("Failed to insert user");
    UserId::from_uuid(user.id)
}

pub async fn insert_account(
    db: &DatabaseConnection,
    user_id: UserId,
    kind: AccountKind,
    balance: Decimal,
    active: bool,
) -> AccountId {
    let now = chrono::Utc::now().fixed_offset();
    let id = Uuid::now_v7();
    accounts::ActiveModel {
        id: Set(id),
        user_id: Set(user_id.into_inner()),
        account_number: Set(format!("{:012}", id.as_u128() % 1_000_000_000_000)),
        kind: Set(kind),
        balance: Set(balance),
        active: Set(active),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(db)
    .await
    .expect("Failed to insert account");
    AccountId::from_uuid(id)
}

pub async fn balance(db: &DatabaseConnection, id: AccountId) -> Decimal {
    use sea_orm::EntityTrait;
    accounts::Entity::find_by_id(id.into_inner())
        .one(db)
        .await
        .expect("Failed to read account")
        .expect("Account should exist")
        .balance
}
