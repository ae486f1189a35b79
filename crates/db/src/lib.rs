//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - The `SeaORM` implementation of the ledger store
//! - Repository abstractions for queries and account/user management
//! - Database migrations

mod convert;
pub mod entities;
pub mod migration;
pub mod repositories;

pub use convert::storage_error;
pub use repositories::{
    AccountError, AccountRepository, CreateAccountInput, CreateUserInput, SeaOrmLedgerStore,
    SeaOrmUnitOfWork, TransactionRepository, UpdateAccountInput, UpdateUserInput, UserError,
    UserRepository,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;
use tracing::info;

/// Opens the connection pool described by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    info!(
        max_connections = config.max_connections,
        backend = ?db.get_database_backend(),
        "database pool opened"
    );
    Ok(db)
}
