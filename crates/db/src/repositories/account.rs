//! Account repository: account listings and account management.
//!
//! Listings exclude soft-deleted accounts and join the owning user. A user
//! holds at most one live account of each kind.

use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use tally_core::ledger::{Account, AccountKind as DomainAccountKind, OwnedAccount, Owner};
use tally_shared::config::LedgerConfig;
use tally_shared::types::{AccountId, Page, PageRequest, UserId};
use tally_shared::AppError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::AccountKind;
use crate::entities::{accounts, users};

const ACCOUNT_NUMBER_ATTEMPTS: usize = 5;

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found or soft-deleted.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Owning user not found or soft-deleted.
    #[error("User does not exist: {0}")]
    UserNotFound(UserId),

    /// User already holds a live account of this kind.
    #[error("User {user_id} already has a {kind} account")]
    AccountAlreadyExists {
        /// The user.
        user_id: UserId,
        /// The duplicated kind.
        kind: DomainAccountKind,
    },

    /// Opening balance outside the configured range.
    #[error("Opening balance {balance} must be between {min} and {max}")]
    InvalidOpeningBalance {
        /// Requested balance.
        balance: Decimal,
        /// Lowest allowed balance.
        min: i64,
        /// Highest allowed balance.
        max: i64,
    },

    /// Could not find a free account number.
    #[error("Could not allocate a unique account number")]
    AccountNumberExhausted,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "NOT_FOUND",
            Self::UserNotFound(_) => "USER_DOES_NOT_EXIST",
            Self::AccountAlreadyExists { .. } => "ACCOUNT_ALREADY_EXISTS",
            Self::InvalidOpeningBalance { .. } => "INVALID_OPENING_BALANCE",
            Self::AccountNumberExhausted => "INTERNAL_ERROR",
            Self::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) => "STORAGE_UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) | Self::UserNotFound(_) => 404,
            Self::AccountAlreadyExists { .. } | Self::InvalidOpeningBalance { .. } => 400,
            Self::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) => 503,
            Self::AccountNumberExhausted | Self::Database(_) => 500,
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        let message = err.to_string();
        match err {
            AccountError::AccountNotFound(_) | AccountError::UserNotFound(_) => {
                Self::NotFound(message)
            }
            AccountError::AccountAlreadyExists { .. } => Self::BusinessRule(message),
            AccountError::InvalidOpeningBalance { .. } => Self::Validation(message),
            AccountError::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) => {
                Self::StorageUnavailable(message)
            }
            AccountError::Database(_) => Self::Database(message),
            AccountError::AccountNumberExhausted => Self::Internal(message),
        }
    }
}

fn default_opening_balance() -> Decimal {
    Decimal::from(LedgerConfig::default().min_opening_balance)
}

fn default_active() -> bool {
    true
}

/// Input for opening an account.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountInput {
    /// Owning user.
    pub user_id: UserId,
    /// Product type.
    #[serde(rename = "type")]
    pub kind: DomainAccountKind,
    /// Opening balance in minor units.
    #[serde(default = "default_opening_balance")]
    pub balance: Decimal,
    /// Whether the account starts active.
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Input for updating an account. Balance and owner are not updatable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAccountInput {
    /// New product type.
    #[serde(default, rename = "type")]
    pub kind: Option<DomainAccountKind>,
    /// New active flag.
    #[serde(default)]
    pub active: Option<bool>,
}

/// Account repository for listings and management.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
    limits: LedgerConfig,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, limits: LedgerConfig) -> Self {
        Self { db, limits }
    }

    /// Lists live accounts with their owners, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts(
        &self,
        request: &PageRequest,
    ) -> Result<Page<OwnedAccount>, AccountError> {
        debug!(page = request.page, limit = request.limit, "listing accounts");
        self.page(None, request).await
    }

    /// Lists the live accounts of one user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts_by_user(
        &self,
        user_id: UserId,
        request: &PageRequest,
    ) -> Result<Page<OwnedAccount>, AccountError> {
        debug!(%user_id, page = request.page, limit = request.limit, "listing accounts by user");
        self.page(Some(user_id), request).await
    }

    /// Gets a live account with its owner.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is missing or soft-deleted.
    pub async fn get_account(&self, id: AccountId) -> Result<OwnedAccount, AccountError> {
        debug!(account_id = %id, "finding account");
        let (account, user) = accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::DeletedAt.is_null())
            .find_also_related(users::Entity)
            .one(&self.db)
            .await?
            .ok_or(AccountError::AccountNotFound(id))?;
        Ok(OwnedAccount {
            account: account.into(),
            user: user.map(Owner::from),
        })
    }

    /// Opens a new account for an existing user.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, `AccountAlreadyExists`, `InvalidOpeningBalance`,
    /// or a database error.
    pub async fn create_account(&self, input: CreateAccountInput) -> Result<Account, AccountError> {
        debug!(user_id = %input.user_id, kind = %input.kind, "creating account");
        let min = Decimal::from(self.limits.min_opening_balance);
        let max = Decimal::from(self.limits.max_opening_balance);
        if input.balance < min || input.balance > max || input.balance.normalize().scale() > 2 {
            return Err(AccountError::InvalidOpeningBalance {
                balance: input.balance,
                min: self.limits.min_opening_balance,
                max: self.limits.max_opening_balance,
            });
        }

        let txn = self.db.begin().await?;

        let user = users::Entity::find_by_id(input.user_id.into_inner())
            .filter(users::Column::DeletedAt.is_null())
            .one(&txn)
            .await?;
        if user.is_none() {
            return Err(AccountError::UserNotFound(input.user_id));
        }

        let kind = AccountKind::from(input.kind);
        let existing = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(input.user_id.into_inner()))
            .filter(accounts::Column::Kind.eq(kind))
            .filter(accounts::Column::DeletedAt.is_null())
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(AccountError::AccountAlreadyExists {
                user_id: input.user_id,
                kind: input.kind,
            });
        }

        let mut account_number = None;
        for _ in 0..ACCOUNT_NUMBER_ATTEMPTS {
            let candidate = generate_account_number();
            let taken = accounts::Entity::find()
                .filter(accounts::Column::AccountNumber.eq(candidate.as_str()))
                .count(&txn)
                .await?;
            if taken == 0 {
                account_number = Some(candidate);
                break;
            }
        }
        let account_number = account_number.ok_or(AccountError::AccountNumberExhausted)?;

        let now = chrono::Utc::now().fixed_offset();
        let model = accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(input.user_id.into_inner()),
            account_number: Set(account_number),
            kind: Set(kind),
            balance: Set(input.balance),
            active: Set(input.active),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(account_id = %model.id, user_id = %input.user_id, "account created");
        Ok(model.into())
    }

    /// Updates the kind and/or active flag of a live account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `AccountAlreadyExists` when switching to a
    /// kind the user already holds, or a database error.
    pub async fn update_account(
        &self,
        id: AccountId,
        input: UpdateAccountInput,
    ) -> Result<Account, AccountError> {
        debug!(account_id = %id, "updating account");
        let txn = self.db.begin().await?;

        let model = accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::DeletedAt.is_null())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(AccountError::AccountNotFound(id))?;

        if let Some(kind) = input.kind.map(AccountKind::from)
            && kind != model.kind
        {
            let clash = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(model.user_id))
                .filter(accounts::Column::Kind.eq(kind))
                .filter(accounts::Column::DeletedAt.is_null())
                .count(&txn)
                .await?;
            if clash > 0 {
                return Err(AccountError::AccountAlreadyExists {
                    user_id: UserId::from_uuid(model.user_id),
                    kind: kind.into(),
                });
            }
        }

        let mut active: accounts::ActiveModel = model.into();
        if let Some(kind) = input.kind {
            active.kind = Set(kind.into());
        }
        if let Some(flag) = input.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(chrono::Utc::now().fixed_offset());
        let model = active.update(&txn).await?;
        txn.commit().await?;

        info!(account_id = %id, "account updated");
        Ok(model.into())
    }

    /// Soft-deletes an account. Its transactions stay untouched.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is missing or already deleted.
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AccountError> {
        debug!(account_id = %id, "deleting account");
        let now = chrono::Utc::now().fixed_offset();
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::DeletedAt, sea_orm::sea_query::Expr::value(now))
            .col_expr(accounts::Column::UpdatedAt, sea_orm::sea_query::Expr::value(now))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .filter(accounts::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AccountError::AccountNotFound(id));
        }
        info!(account_id = %id, "account deleted");
        Ok(())
    }

    /// Flips the active flag of a live account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is missing or soft-deleted.
    pub async fn switch_status(&self, id: AccountId) -> Result<Account, AccountError> {
        debug!(account_id = %id, "switching account status");
        let txn = self.db.begin().await?;
        let model = accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::DeletedAt.is_null())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(AccountError::AccountNotFound(id))?;

        let flipped = !model.active;
        let mut active: accounts::ActiveModel = model.into();
        active.active = Set(flipped);
        active.updated_at = Set(chrono::Utc::now().fixed_offset());
        let model = active.update(&txn).await?;
        txn.commit().await?;

        info!(account_id = %id, active = flipped, "account status switched");
        Ok(model.into())
    }

    async fn page(
        &self,
        user_id: Option<UserId>,
        request: &PageRequest,
    ) -> Result<Page<OwnedAccount>, AccountError> {
        let mut select = accounts::Entity::find().filter(accounts::Column::DeletedAt.is_null());
        if let Some(user_id) = user_id {
            select = select.filter(accounts::Column::UserId.eq(user_id.into_inner()));
        }

        let total = select.clone().count(&self.db).await?;
        let rows = select
            .order_by_desc(accounts::Column::CreatedAt)
            .order_by_desc(accounts::Column::Id)
            .offset(request.skip())
            .limit(request.limit())
            .find_also_related(users::Entity)
            .all(&self.db)
            .await?;

        let items = rows
            .into_iter()
            .map(|(account, user)| OwnedAccount {
                account: account.into(),
                user: user.map(Owner::from),
            })
            .collect();
        Ok(Page::new(items, total, request))
    }
}

/// Generates a random 12-digit account number.
fn generate_account_number() -> String {
    let n: u64 = rand::rng().random_range(0..1_000_000_000_000);
    format!("{n:012}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_number_is_twelve_digits() {
        for _ in 0..100 {
            let number = generate_account_number();
            assert_eq!(number.len(), 12);
            assert!(number.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_create_input_defaults() {
        let input: CreateAccountInput = serde_json::from_value(serde_json::json!({
            "user_id": Uuid::nil(),
            "type": "savings"
        }))
        .unwrap();
        assert_eq!(input.kind, DomainAccountKind::Savings);
        assert_eq!(input.balance, Decimal::from(5000));
        assert!(input.active);
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AccountError::UserNotFound(UserId::new()).http_status_code(), 404);
        assert_eq!(
            AccountError::AccountAlreadyExists {
                user_id: UserId::new(),
                kind: DomainAccountKind::Checking,
            }
            .error_code(),
            "ACCOUNT_ALREADY_EXISTS"
        );
        assert_eq!(
            AccountError::Database(DbErr::Custom("x".into())).http_status_code(),
            500
        );
    }
}
