//! Ledger engine.
//!
//! - Domain types for accounts and transactions
//! - Error taxonomy with stable codes
//! - Account invariant checks
//! - Storage ports (store and unit of work) plus an in-memory store
//! - The transaction engine: deposit, withdraw, transfer, refund

pub mod engine;
pub mod error;
pub mod invariants;
pub mod memory;
pub mod store;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::TransactionEngine;
pub use error::LedgerError;
pub use memory::{MemoryLedgerStore, MemoryUnitOfWork};
pub use store::{AccountFilter, LedgerStore, UnitOfWork};
pub use types::{
    Account, AccountKind, NewTransaction, OwnedAccount, Owner, PostedTransaction, RefundOutcome,
    Role, Transaction, TransactionDetail, TransactionKind, TransactionPatch,
};
