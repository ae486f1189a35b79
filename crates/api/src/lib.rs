//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for transactions, accounts and users
//! - JSON error responses mapped from domain errors
//! - Extractors whose rejections share that error format

pub mod error;
pub mod extractors;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tally_core::ledger::TransactionEngine;
use tally_db::SeaOrmLedgerStore;
use tally_shared::config::LedgerConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Transaction engine over the database ledger store.
    pub engine: Arc<TransactionEngine<SeaOrmLedgerStore>>,
    /// Deployment-tunable ledger rules.
    pub ledger: LedgerConfig,
}

impl AppState {
    /// Builds the state around an open connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection, ledger: LedgerConfig) -> Self {
        let engine = TransactionEngine::new(SeaOrmLedgerStore::new(db.clone()));
        Self {
            db: Arc::new(db),
            engine: Arc::new(engine),
            ledger,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
