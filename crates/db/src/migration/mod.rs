//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and run unchanged on
//! PostgreSQL and SQLite.

pub use sea_orm_migration::prelude::*;

mod m20261018_000001_initial;
mod m20261018_000002_live_indexes;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261018_000001_initial::Migration),
            Box::new(m20261018_000002_live_indexes::Migration),
        ]
    }
}
