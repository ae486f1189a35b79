//! Storage ports used by the transaction engine.
//!
//! A [`LedgerStore`] hands out [`UnitOfWork`]s. Every read and write of one
//! engine operation goes through a single unit, which either commits all of
//! them or none. Accounts read through a unit stay locked against other
//! units until it ends.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TransactionId};

use super::error::LedgerError;
use super::types::{Account, NewTransaction, Transaction, TransactionDetail, TransactionPatch};

/// Criteria for looking up a single account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    /// Account id.
    pub id: Option<AccountId>,
    /// Whether soft-deleted accounts match.
    pub include_deleted: bool,
}

impl AccountFilter {
    /// Matches one account by id, soft-deleted or not.
    #[must_use]
    pub fn by_id(id: AccountId) -> Self {
        Self {
            id: Some(id),
            include_deleted: true,
        }
    }

    /// Returns true if `account` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, account: &Account) -> bool {
        self.id.is_none_or(|id| account.id == id) && (self.include_deleted || !account.is_deleted())
    }
}

/// Factory of units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Unit of work type handed out by this store.
    type Unit: UnitOfWork;

    /// Opens a new unit of work.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::StorageUnavailable` if the store cannot be reached.
    async fn begin(&self) -> Result<Self::Unit, LedgerError>;
}

/// One atomic, isolated scope of ledger reads and writes.
///
/// Dropping a unit without committing discards its writes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Finds and locks the first account matching `filter`.
    async fn find_account(&mut self, filter: &AccountFilter) -> Result<Option<Account>, LedgerError>;

    /// Sets the balance of `id` to `balance` if it still equals `expected`.
    ///
    /// Returns the number of rows changed, zero when the guard did not hold.
    async fn update_account_balance(
        &mut self,
        id: AccountId,
        expected: Decimal,
        balance: Decimal,
    ) -> Result<u64, LedgerError>;

    /// Finds and locks a transaction, joined with both accounts and owners.
    async fn find_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<TransactionDetail>, LedgerError>;

    /// Inserts a transaction, assigning its id and timestamps.
    async fn insert_transaction(&mut self, new: NewTransaction) -> Result<Transaction, LedgerError>;

    /// Applies `patch` to an unrefunded transaction.
    ///
    /// Returns the updated record, or `None` if no unrefunded transaction
    /// with that id exists.
    async fn update_transaction(
        &mut self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>, LedgerError>;

    /// Makes every write of this unit durable and visible.
    async fn commit(self) -> Result<(), LedgerError>;

    /// Discards every write of this unit.
    async fn rollback(self) -> Result<(), LedgerError>;
}
