//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod account;
pub mod ledger_store;
pub mod transaction;
pub mod user;

pub use account::{AccountError, AccountRepository, CreateAccountInput, UpdateAccountInput};
pub use ledger_store::{SeaOrmLedgerStore, SeaOrmUnitOfWork};
pub use transaction::TransactionRepository;
pub use user::{CreateUserInput, UpdateUserInput, UserError, UserRepository};
