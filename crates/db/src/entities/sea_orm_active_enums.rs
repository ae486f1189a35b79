//! `SeaORM` active enums, stored as short strings so every backend can hold them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::{AccountKind as DomainAccountKind, TransactionKind as DomainTransactionKind};

/// Account product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Checking account.
    #[sea_orm(string_value = "checking")]
    Checking,
    /// Savings account.
    #[sea_orm(string_value = "savings")]
    Savings,
}

/// Kind of ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Deposit.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Withdrawal.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Transfer.
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Refund.
    #[sea_orm(string_value = "refund")]
    Refund,
}

impl From<DomainAccountKind> for AccountKind {
    fn from(kind: DomainAccountKind) -> Self {
        match kind {
            DomainAccountKind::Checking => Self::Checking,
            DomainAccountKind::Savings => Self::Savings,
        }
    }
}

impl From<AccountKind> for DomainAccountKind {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Checking => Self::Checking,
            AccountKind::Savings => Self::Savings,
        }
    }
}

impl From<DomainTransactionKind> for TransactionKind {
    fn from(kind: DomainTransactionKind) -> Self {
        match kind {
            DomainTransactionKind::Deposit => Self::Deposit,
            DomainTransactionKind::Withdrawal => Self::Withdrawal,
            DomainTransactionKind::Transfer => Self::Transfer,
            DomainTransactionKind::Refund => Self::Refund,
        }
    }
}

impl From<TransactionKind> for DomainTransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Deposit => Self::Deposit,
            TransactionKind::Withdrawal => Self::Withdrawal,
            TransactionKind::Transfer => Self::Transfer,
            TransactionKind::Refund => Self::Refund,
        }
    }
}
