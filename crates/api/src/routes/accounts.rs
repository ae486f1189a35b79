//! Account management routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use tally_core::ledger::{Account, OwnedAccount};
use tally_db::{AccountRepository, CreateAccountInput, UpdateAccountInput};
use tally_shared::types::{AccountId, Page, PageRequest, UserId};

use crate::{
    AppState,
    error::ApiError,
    extractors::{Json, Path, Query},
};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/{id}",
            get(get_account).patch(update_account).delete(delete_account),
        )
        .route("/accounts/{id}/active", patch(switch_status))
        .route("/accounts/user/{user_id}", get(list_accounts_by_user))
}

fn repository(state: &AppState) -> AccountRepository {
    AccountRepository::new((*state.db).clone(), state.ledger)
}

/// GET `/accounts` - List live accounts.
async fn list_accounts(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<OwnedAccount>>, ApiError> {
    Ok(Json(repository(&state).list_accounts(&page).await?))
}

/// GET `/accounts/user/{user_id}` - List the live accounts of a user.
async fn list_accounts_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<OwnedAccount>>, ApiError> {
    Ok(Json(
        repository(&state)
            .list_accounts_by_user(user_id, &page)
            .await?,
    ))
}

/// POST `/accounts` - Open an account.
async fn create_account(
    State(state): State<AppState>,
    Json(input): Json<CreateAccountInput>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = repository(&state).create_account(input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET `/accounts/{id}` - Get a live account with its owner.
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<Json<OwnedAccount>, ApiError> {
    Ok(Json(repository(&state).get_account(id).await?))
}

/// PATCH `/accounts/{id}` - Change kind or active flag.
async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    Json(input): Json<UpdateAccountInput>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(repository(&state).update_account(id, input).await?))
}

/// PATCH `/accounts/{id}/active` - Toggle the active flag.
async fn switch_status(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(repository(&state).switch_status(id).await?))
}

/// DELETE `/accounts/{id}` - Soft-delete an account.
async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<StatusCode, ApiError> {
    repository(&state).delete_account(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
