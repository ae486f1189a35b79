//! Ledger error types.
//!
//! Every failure of a money movement maps to exactly one variant here. Each
//! variant carries a stable error code and an HTTP status so the API layer
//! can render it without inspecting messages.

use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::{AccountId, TransactionId};
use thiserror::Error;

use super::types::Role;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount is zero, negative, or has more than two decimal places.
    #[error("Amount must be positive with at most 2 decimal places, got {0}")]
    InvalidAmount(Decimal),

    /// Transfer source and destination are the same account.
    #[error("Cannot transfer from account {0} to itself")]
    SameAccountTransfer(AccountId),

    // ========== Account Errors ==========
    /// Account referenced by the operation does not exist.
    #[error("The {role} account {id} does not exist")]
    AccountNotFound {
        /// Side of the movement the account plays.
        role: Role,
        /// The missing account.
        id: AccountId,
    },

    /// Account is not active.
    #[error("The {role} account {id} is inactive")]
    AccountInactive {
        /// Side of the movement the account plays.
        role: Role,
        /// The inactive account.
        id: AccountId,
    },

    /// Debit would take the balance below zero.
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// The account being debited.
        account: AccountId,
        /// Balance at the time of the check.
        balance: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    // ========== Transaction State Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Transaction kind cannot be refunded.
    #[error("Transaction {0} is not refundable")]
    RefundNotAllowed(TransactionId),

    /// Transaction was already refunded.
    #[error("Transaction {0} has already been refunded")]
    AlreadyRefunded(TransactionId),

    // ========== Concurrency Errors ==========
    /// Balance changed between read and write.
    #[error("Concurrent modification of account {0}, please retry")]
    ConcurrentModification(AccountId),

    // ========== Storage Errors ==========
    /// Store could not be reached.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Store rejected or failed the operation.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "AMOUNT_MUST_BE_POSITIVE",
            Self::SameAccountTransfer(_) => "SAME_ACCOUNT_TRANSFER",
            Self::AccountNotFound {
                role: Role::Source, ..
            } => "FROM_ACCOUNT_DOES_NOT_EXIST",
            Self::AccountNotFound {
                role: Role::Destination,
                ..
            } => "TO_ACCOUNT_DOES_NOT_EXIST",
            Self::AccountInactive {
                role: Role::Source, ..
            } => "FROM_ACCOUNT_INACTIVE",
            Self::AccountInactive {
                role: Role::Destination,
                ..
            } => "TO_ACCOUNT_INACTIVE",
            Self::InsufficientFunds { .. } => "NOT_ENOUGH_MONEY",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::RefundNotAllowed(_) => "REFUND_NOT_ALLOWED",
            Self::AlreadyRefunded(_) => "ALREADY_REFUNDED",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - rule violations
            Self::InvalidAmount(_)
            | Self::SameAccountTransfer(_)
            | Self::AccountInactive { .. }
            | Self::InsufficientFunds { .. }
            | Self::RefundNotAllowed(_)
            | Self::AlreadyRefunded(_) => 400,

            // 404 Not Found
            Self::AccountNotFound { .. } | Self::TransactionNotFound(_) => 404,

            // 409 Conflict
            Self::ConcurrentModification(_) => 409,

            Self::StorageUnavailable(_) => 503,
            Self::Storage(_) => 500,
        }
    }

    /// Returns true if the caller may retry the whole operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::AccountNotFound { .. } | LedgerError::TransactionNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::InvalidAmount(_) | LedgerError::SameAccountTransfer(_) => {
                Self::Validation(message)
            }
            LedgerError::AccountInactive { .. }
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::RefundNotAllowed(_)
            | LedgerError::AlreadyRefunded(_) => Self::BusinessRule(message),
            LedgerError::ConcurrentModification(_) => Self::Conflict(message),
            LedgerError::StorageUnavailable(_) => Self::StorageUnavailable(message),
            LedgerError::Storage(_) => Self::Database(message),
        }
    }
}
