//! Core business logic for Tally.
//!
//! This crate contains the ledger rules with ZERO web or database dependencies.
//! Storage is reached only through the [`ledger::LedgerStore`] port; the
//! database crate provides the production implementation.
//!
//! # Modules
//!
//! - `ledger` - Accounts, transactions, invariants and the transaction engine

pub mod ledger;
