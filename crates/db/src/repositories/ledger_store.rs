//! `SeaORM` implementation of the ledger store ports.
//!
//! A unit of work is one database transaction. Accounts are read with
//! `SELECT ... FOR UPDATE` on PostgreSQL so competing units queue on the row
//! lock; SQLite ignores the clause and serializes writers on its own. Balance
//! writes are additionally guarded on the balance the unit read.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::ledger::{
    Account, AccountFilter, LedgerError, LedgerStore, NewTransaction, Transaction,
    TransactionDetail, TransactionPatch, UnitOfWork,
};
use tally_shared::types::{AccountId, TransactionId};
use tracing::debug;
use uuid::Uuid;

use super::transaction::with_accounts;
use crate::convert::storage_error;
use crate::entities::sea_orm_active_enums::TransactionKind;
use crate::entities::{accounts, transactions};

/// Ledger store backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmLedgerStore {
    db: DatabaseConnection,
}

impl SeaOrmLedgerStore {
    /// Creates a store over `db`.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for SeaOrmLedgerStore {
    type Unit = SeaOrmUnitOfWork;

    async fn begin(&self) -> Result<Self::Unit, LedgerError> {
        let txn = self.db.begin().await.map_err(storage_error)?;
        Ok(SeaOrmUnitOfWork { txn })
    }
}

/// Unit of work wrapping one database transaction.
///
/// Dropping it without `commit` rolls the transaction back.
pub struct SeaOrmUnitOfWork {
    txn: DatabaseTransaction,
}

impl std::fmt::Debug for SeaOrmUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeaOrmUnitOfWork").finish_non_exhaustive()
    }
}

#[async_trait]
impl UnitOfWork for SeaOrmUnitOfWork {
    async fn find_account(&mut self, filter: &AccountFilter) -> Result<Option<Account>, LedgerError> {
        let mut query = accounts::Entity::find();
        if let Some(id) = filter.id {
            query = query.filter(accounts::Column::Id.eq(id.into_inner()));
        }
        if !filter.include_deleted {
            query = query.filter(accounts::Column::DeletedAt.is_null());
        }

        let model = query
            .order_by_asc(accounts::Column::Id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(model.map(Account::from))
    }

    async fn update_account_balance(
        &mut self,
        id: AccountId,
        expected: Decimal,
        balance: Decimal,
    ) -> Result<u64, LedgerError> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(balance))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .filter(accounts::Column::Balance.eq(expected))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        debug!(account_id = %id, %expected, %balance, rows = result.rows_affected, "balance update");
        Ok(result.rows_affected)
    }

    async fn find_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<TransactionDetail>, LedgerError> {
        // Lock only the transaction row; accounts are locked when the engine loads them.
        let Some(model) = transactions::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?
        else {
            return Ok(None);
        };
        let mut details = with_accounts(&self.txn, vec![model])
            .await
            .map_err(storage_error)?;
        Ok(details.pop())
    }

    async fn insert_transaction(&mut self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        let now = Utc::now().fixed_offset();
        let model = transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            kind: Set(TransactionKind::from(new.kind)),
            amount: Set(new.amount),
            account_id: Set(new.account_id.into_inner()),
            to_account_id: Set(new.to_account_id.map(AccountId::into_inner)),
            refundable: Set(new.refundable),
            refunded: Set(false),
            original_transaction_id: Set(new.original_transaction_id.map(TransactionId::into_inner)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.txn)
        .await
        .map_err(storage_error)?;
        Ok(model.into())
    }

    async fn update_transaction(
        &mut self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>, LedgerError> {
        let mut update = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(transactions::Column::Id.eq(id.into_inner()))
            .filter(transactions::Column::Refunded.eq(false));
        if let Some(refunded) = patch.refunded {
            update = update.col_expr(transactions::Column::Refunded, Expr::value(refunded));
        }
        let result = update.exec(&self.txn).await.map_err(storage_error)?;
        if result.rows_affected == 0 {
            return Ok(None);
        }

        let model = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(model.map(Transaction::from))
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(storage_error)
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.txn.rollback().await.map_err(storage_error)
    }
}
