//! User management routes.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tally_db::entities::users;
use tally_db::{CreateUserInput, UpdateUserInput, UserRepository};
use tally_shared::types::{Page, PageRequest, UserId};

use crate::{
    AppState,
    error::ApiError,
    extractors::{Json, Path, Query},
};

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

fn repository(state: &AppState) -> UserRepository {
    UserRepository::new((*state.db).clone())
}

/// GET `/users` - List live users.
async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<users::Model>>, ApiError> {
    Ok(Json(repository(&state).list_users(&page).await?))
}

/// POST `/users` - Create a user.
async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<users::Model>), ApiError> {
    let user = repository(&state).create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET `/users/{id}` - Get a live user.
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<users::Model>, ApiError> {
    Ok(Json(repository(&state).get_user(id).await?))
}

/// PATCH `/users/{id}` - Rename a user.
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<users::Model>, ApiError> {
    Ok(Json(repository(&state).update_user(id, input).await?))
}

/// DELETE `/users/{id}` - Soft-delete a user.
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    repository(&state).delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
