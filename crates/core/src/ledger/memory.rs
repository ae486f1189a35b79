//! In-memory ledger store.
//!
//! Units of work are serialized: a unit holds the store mutex for its whole
//! lifetime and works on a private copy of the state, which replaces the
//! shared state on commit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TransactionId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::LedgerError;
use super::store::{AccountFilter, LedgerStore, UnitOfWork};
use super::types::{
    Account, NewTransaction, OwnedAccount, Owner, Transaction, TransactionDetail, TransactionPatch,
};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    owners: BTreeMap<UserId, Owner>,
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
}

impl LedgerState {
    fn owned_account(&self, id: AccountId) -> Option<OwnedAccount> {
        let account = self.accounts.get(&id)?.clone();
        let user = self.owners.get(&account.user_id).cloned();
        Some(OwnedAccount { account, user })
    }
}

/// A thread-safe in-memory [`LedgerStore`].
///
/// Cloning yields a handle to the same state.
#[derive(Debug, Clone)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn put_owner(&self, owner: Owner) {
        self.state.lock().await.owners.insert(owner.id, owner);
    }

    /// Adds or replaces an account.
    pub async fn put_account(&self, account: Account) {
        self.state.lock().await.accounts.insert(account.id, account);
    }

    /// Returns the committed state of an account.
    pub async fn account(&self, id: AccountId) -> Option<Account> {
        self.state.lock().await.accounts.get(&id).cloned()
    }

    /// Returns the committed state of a transaction.
    pub async fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.state.lock().await.transactions.get(&id).cloned()
    }

    /// Returns every committed transaction, newest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        let state = self.state.lock().await;
        let mut all: Vec<_> = state.transactions.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        all
    }

    /// Simulates losing or regaining the connection to the store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Unit = MemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Unit, LedgerError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(LedgerError::StorageUnavailable(
                "in-memory store is offline".to_string(),
            ));
        }
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryUnitOfWork { guard, staged })
    }
}

/// Unit of work over a [`MemoryLedgerStore`].
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<LedgerState>,
    staged: LedgerState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_account(&mut self, filter: &AccountFilter) -> Result<Option<Account>, LedgerError> {
        Ok(self
            .staged
            .accounts
            .values()
            .find(|account| filter.matches(account))
            .cloned())
    }

    async fn update_account_balance(
        &mut self,
        id: AccountId,
        expected: Decimal,
        balance: Decimal,
    ) -> Result<u64, LedgerError> {
        match self.staged.accounts.get_mut(&id) {
            Some(account) if account.balance == expected => {
                account.balance = balance;
                account.updated_at = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn find_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<TransactionDetail>, LedgerError> {
        let Some(transaction) = self.staged.transactions.get(&id).cloned() else {
            return Ok(None);
        };
        let account = self.staged.owned_account(transaction.account_id);
        let to_account = transaction
            .to_account_id
            .and_then(|to| self.staged.owned_account(to));
        Ok(Some(TransactionDetail {
            transaction,
            account,
            to_account,
        }))
    }

    async fn insert_transaction(&mut self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        let now = Utc::now();
        let transaction = Transaction {
            id: TransactionId::new(),
            kind: new.kind,
            amount: new.amount,
            account_id: new.account_id,
            to_account_id: new.to_account_id,
            refundable: new.refundable,
            refunded: false,
            original_transaction_id: new.original_transaction_id,
            created_at: now,
            updated_at: now,
        };
        self.staged
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn update_transaction(
        &mut self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>, LedgerError> {
        let Some(transaction) = self.staged.transactions.get_mut(&id) else {
            return Ok(None);
        };
        if transaction.refunded {
            return Ok(None);
        }
        if let Some(refunded) = patch.refunded {
            transaction.refunded = refunded;
        }
        transaction.updated_at = Utc::now();
        Ok(Some(transaction.clone()))
    }

    async fn commit(mut self) -> Result<(), LedgerError> {
        *self.guard = self.staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        Ok(())
    }
}
