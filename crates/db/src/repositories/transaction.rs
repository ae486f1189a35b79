//! Transaction repository: read-only views of the transaction history.
//!
//! Every item is joined with its source and destination accounts and their
//! owners. Listings are ordered newest first, with the time-ordered id as
//! tie-breaker, so repeated reads of unchanged data page identically.

use std::collections::{BTreeSet, HashMap};

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use tally_core::ledger::{LedgerError, OwnedAccount, Owner, TransactionDetail};
use tally_shared::types::{Page, PageRequest, TransactionId, UserId};
use tracing::debug;
use uuid::Uuid;

use crate::convert::storage_error;
use crate::entities::{accounts, transactions, users};

/// Joins transactions with their accounts and owners in two batched reads.
pub(crate) async fn with_accounts<C: ConnectionTrait>(
    db: &C,
    models: Vec<transactions::Model>,
) -> Result<Vec<TransactionDetail>, DbErr> {
    let account_ids: BTreeSet<Uuid> = models
        .iter()
        .flat_map(|m| std::iter::once(m.account_id).chain(m.to_account_id))
        .collect();
    if account_ids.is_empty() {
        return Ok(Vec::new());
    }

    let account_models = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(account_ids))
        .all(db)
        .await?;
    let user_ids: BTreeSet<Uuid> = account_models.iter().map(|a| a.user_id).collect();
    let owners: HashMap<Uuid, Owner> = users::Entity::find()
        .filter(users::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, Owner::from(u)))
        .collect();

    let owned: HashMap<Uuid, OwnedAccount> = account_models
        .into_iter()
        .map(|a| {
            let user = owners.get(&a.user_id).cloned();
            (
                a.id,
                OwnedAccount {
                    account: a.into(),
                    user,
                },
            )
        })
        .collect();

    Ok(models
        .into_iter()
        .map(|m| {
            let account = owned.get(&m.account_id).cloned();
            let to_account = m.to_account_id.and_then(|id| owned.get(&id).cloned());
            TransactionDetail {
                transaction: m.into(),
                account,
                to_account,
            }
        })
        .collect())
}

/// Transaction repository for history queries.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists all transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database query fails.
    pub async fn list_transactions(
        &self,
        request: &PageRequest,
    ) -> Result<Page<TransactionDetail>, LedgerError> {
        debug!(page = request.page, limit = request.limit, "listing transactions");
        self.page(transactions::Entity::find(), request).await
    }

    /// Finds a single transaction with its accounts.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database query fails.
    pub async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<TransactionDetail>, LedgerError> {
        debug!(transaction_id = %id, "finding transaction");
        let Some(model) = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage_error)?
        else {
            return Ok(None);
        };
        let mut details = with_accounts(&self.db, vec![model])
            .await
            .map_err(storage_error)?;
        Ok(details.pop())
    }

    /// Lists transactions where either side belongs to `user_id`.
    ///
    /// Soft-deleted accounts of the user still count.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database query fails.
    pub async fn list_transactions_by_user(
        &self,
        user_id: UserId,
        request: &PageRequest,
    ) -> Result<Page<TransactionDetail>, LedgerError> {
        debug!(%user_id, page = request.page, limit = request.limit, "listing transactions by user");
        let account_ids: Vec<Uuid> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::Id)
            .filter(accounts::Column::UserId.eq(user_id.into_inner()))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(storage_error)?;
        if account_ids.is_empty() {
            return Ok(Page::new(Vec::new(), 0, request));
        }

        let select = transactions::Entity::find().filter(
            Condition::any()
                .add(transactions::Column::AccountId.is_in(account_ids.clone()))
                .add(transactions::Column::ToAccountId.is_in(account_ids)),
        );
        self.page(select, request).await
    }

    async fn page(
        &self,
        select: Select<transactions::Entity>,
        request: &PageRequest,
    ) -> Result<Page<TransactionDetail>, LedgerError> {
        let total = select
            .clone()
            .count(&self.db)
            .await
            .map_err(storage_error)?;
        let models = select
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(request.skip())
            .limit(request.limit())
            .all(&self.db)
            .await
            .map_err(storage_error)?;
        let items = with_accounts(&self.db, models)
            .await
            .map_err(storage_error)?;
        Ok(Page::new(items, total, request))
    }
}
