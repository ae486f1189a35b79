//! Partial indexes over live (not soft-deleted) rows.
//!
//! Account listings and the one-account-per-kind lookup only ever read live
//! rows, so these indexes skip soft-deleted accounts and users.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(ACCOUNTS_LIVE_OWNER_KIND_SQL).await?;
        db.execute_unprepared(USERS_LIVE_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP INDEX IF EXISTS idx_accounts_live_owner_kind")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_users_live")
            .await?;
        Ok(())
    }
}

// One-account-per-kind lookup and per-user listings
const ACCOUNTS_LIVE_OWNER_KIND_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_accounts_live_owner_kind
    ON accounts(user_id, "type") WHERE deleted_at IS NULL
"#;

// User listings
const USERS_LIVE_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_users_live
    ON users(created_at DESC) WHERE deleted_at IS NULL
";
