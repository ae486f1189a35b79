//! Conversions between `SeaORM` models and ledger domain types.

use chrono::Utc;
use sea_orm::DbErr;
use tally_core::ledger::{Account, LedgerError, Owner, Transaction};
use tally_shared::types::{AccountId, TransactionId, UserId};

use crate::entities::{accounts, transactions, users};

/// Maps a database error onto the ledger taxonomy.
///
/// Connection and pool failures are `StorageUnavailable`; everything else is
/// a plain `Storage` error.
pub fn storage_error(err: DbErr) -> LedgerError {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => {
            LedgerError::StorageUnavailable(err.to_string())
        }
        other => LedgerError::Storage(other.to_string()),
    }
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            user_id: UserId::from_uuid(model.user_id),
            account_number: model.account_number,
            kind: model.kind.into(),
            balance: model.balance,
            active: model.active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
            deleted_at: model.deleted_at.map(|at| at.with_timezone(&Utc)),
        }
    }
}

impl From<users::Model> for Owner {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::from_uuid(model.id),
            name: model.name,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<transactions::Model> for Transaction {
    fn from(model: transactions::Model) -> Self {
        Self {
            id: TransactionId::from_uuid(model.id),
            kind: model.kind.into(),
            amount: model.amount,
            account_id: AccountId::from_uuid(model.account_id),
            to_account_id: model.to_account_id.map(AccountId::from_uuid),
            refundable: model.refundable,
            refunded: model.refunded,
            original_transaction_id: model.original_transaction_id.map(TransactionId::from_uuid),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
