//! User repository for database operations.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use tally_shared::AppError;
use tally_shared::types::{Page, PageRequest, UserId};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::users;

/// Error types for user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// User not found or soft-deleted.
    #[error("User not found: {0}")]
    NotFound(UserId),

    /// Name is blank.
    #[error("User name must not be empty")]
    EmptyName,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl UserError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::EmptyName => 400,
            Self::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) => 503,
            Self::Database(_) => 500,
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        let message = err.to_string();
        match err {
            UserError::NotFound(_) => Self::NotFound(message),
            UserError::EmptyName => Self::Validation(message),
            UserError::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) => {
                Self::StorageUnavailable(message)
            }
            UserError::Database(_) => Self::Database(message),
        }
    }
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    /// Display name.
    pub name: String,
}

/// Input for updating a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
}

fn checked_name(name: &str) -> Result<String, UserError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UserError::EmptyName);
    }
    Ok(name.to_string())
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns `EmptyName` or a database error.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<users::Model, UserError> {
        let name = checked_name(&input.name)?;
        let now = chrono::Utc::now().fixed_offset();
        let user = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&self.db)
        .await?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Finds a live user by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user is missing or soft-deleted.
    pub async fn get_user(&self, id: UserId) -> Result<users::Model, UserError> {
        debug!(user_id = %id, "finding user");
        users::Entity::find_by_id(id.into_inner())
            .filter(users::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Lists live users, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_users(&self, request: &PageRequest) -> Result<Page<users::Model>, UserError> {
        debug!(page = request.page, limit = request.limit, "listing users");
        let select = users::Entity::find().filter(users::Column::DeletedAt.is_null());
        let total = select.clone().count(&self.db).await?;
        let items = select
            .order_by_desc(users::Column::CreatedAt)
            .order_by_desc(users::Column::Id)
            .offset(request.skip())
            .limit(request.limit())
            .all(&self.db)
            .await?;
        Ok(Page::new(items, total, request))
    }

    /// Updates a live user.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `EmptyName`, or a database error.
    pub async fn update_user(
        &self,
        id: UserId,
        input: UpdateUserInput,
    ) -> Result<users::Model, UserError> {
        let user = self.get_user(id).await?;
        let mut active: users::ActiveModel = user.into();
        if let Some(name) = input.name.as_deref() {
            active.name = Set(checked_name(name)?);
        }
        active.updated_at = Set(chrono::Utc::now().fixed_offset());
        let user = active.update(&self.db).await?;
        info!(user_id = %id, "user updated");
        Ok(user)
    }

    /// Soft-deletes a user. Accounts are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user is missing or already deleted.
    pub async fn delete_user(&self, id: UserId) -> Result<(), UserError> {
        let now = chrono::Utc::now().fixed_offset();
        let result = users::Entity::update_many()
            .col_expr(users::Column::DeletedAt, Expr::value(now))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(id.into_inner()))
            .filter(users::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(UserError::NotFound(id));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
