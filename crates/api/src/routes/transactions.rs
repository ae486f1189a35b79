//! Transaction routes: history queries and money movements.

use std::str::FromStr;

use axum::{
    Router,
    extract::State,
    routing::{get, post, put},
};
use rust_decimal::Decimal;
use tally_core::ledger::{LedgerError, PostedTransaction, RefundOutcome, TransactionDetail};
use tally_db::TransactionRepository;
use tally_shared::types::{AccountId, Page, PageRequest, TransactionId, UserId};
use tracing::debug;

use crate::{
    AppState,
    error::ApiError,
    extractors::{Json, Path, Query},
};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/{id}", get(get_transaction))
        .route("/transactions/user/{user_id}", get(list_transactions_by_user))
        .route("/transactions/transfer/{from}/{to}/{amount}", put(transfer))
        .route("/transactions/deposit/{to}/{amount}", post(deposit))
        .route("/transactions/withdraw/{from}/{amount}", post(withdraw))
        .route("/transactions/refund/{transaction_id}", post(refund))
}

/// Parses an amount path segment. Sign and scale are checked by the engine.
fn parse_amount(raw: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw.trim()).map_err(|_| {
        ApiError::bad_request(
            "INVALID_AMOUNT_FORMAT",
            format!("Amount '{raw}' is not a decimal number"),
        )
    })
}

/// GET `/transactions` - List all transactions, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransactionDetail>>, ApiError> {
    let repo = TransactionRepository::new((*state.db).clone());
    Ok(Json(repo.list_transactions(&page).await?))
}

/// GET `/transactions/{id}` - Get one transaction with its accounts.
async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<TransactionId>,
) -> Result<Json<TransactionDetail>, ApiError> {
    let repo = TransactionRepository::new((*state.db).clone());
    let detail = repo
        .get_transaction(id)
        .await?
        .ok_or(LedgerError::TransactionNotFound(id))?;
    Ok(Json(detail))
}

/// GET `/transactions/user/{user_id}` - List transactions touching a user's accounts.
async fn list_transactions_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransactionDetail>>, ApiError> {
    let repo = TransactionRepository::new((*state.db).clone());
    Ok(Json(repo.list_transactions_by_user(user_id, &page).await?))
}

/// PUT `/transactions/transfer/{from}/{to}/{amount}` - Move money between accounts.
async fn transfer(
    State(state): State<AppState>,
    Path((from, to, amount)): Path<(AccountId, AccountId, String)>,
) -> Result<Json<PostedTransaction>, ApiError> {
    let amount = parse_amount(&amount)?;
    debug!(%from, %to, %amount, "transfer requested");
    Ok(Json(state.engine.transfer(from, to, amount).await?))
}

/// POST `/transactions/deposit/{to}/{amount}` - Credit an account.
async fn deposit(
    State(state): State<AppState>,
    Path((to, amount)): Path<(AccountId, String)>,
) -> Result<Json<PostedTransaction>, ApiError> {
    let amount = parse_amount(&amount)?;
    debug!(%to, %amount, "deposit requested");
    Ok(Json(state.engine.deposit(to, amount).await?))
}

/// POST `/transactions/withdraw/{from}/{amount}` - Debit an account.
async fn withdraw(
    State(state): State<AppState>,
    Path((from, amount)): Path<(AccountId, String)>,
) -> Result<Json<PostedTransaction>, ApiError> {
    let amount = parse_amount(&amount)?;
    debug!(%from, %amount, "withdrawal requested");
    Ok(Json(state.engine.withdraw(from, amount).await?))
}

/// POST `/transactions/refund/{transaction_id}` - Reverse a transfer.
async fn refund(
    State(state): State<AppState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<RefundOutcome>, ApiError> {
    debug!(%transaction_id, "refund requested");
    Ok(Json(state.engine.refund(transaction_id).await?))
}
