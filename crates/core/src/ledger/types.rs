//! Ledger domain types.
//!
//! Accounts hold balances in minor currency units; transactions are
//! immutable records of money movement, except for the `refunded` flag which
//! flips once when a transfer is reversed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, TransactionId, UserId};

/// Number of fractional digits kept for every persisted amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest balance a `DECIMAL(14, 2)` column can hold.
pub const MAX_BALANCE: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, MONEY_SCALE);

/// Returns `amount` carrying exactly [`MONEY_SCALE`] fractional digits.
#[must_use]
pub fn to_money_scale(amount: Decimal) -> Decimal {
    let mut amount = amount;
    amount.rescale(MONEY_SCALE);
    amount
}

/// Product type of a bank account. A user holds at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Everyday checking account.
    Checking,
    /// Savings account.
    Savings,
}

impl AccountKind {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            other => Err(format!("unknown account kind: {other}")),
        }
    }
}

/// A bank account as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: AccountId,
    /// Owning user.
    pub user_id: UserId,
    /// Customer facing account number.
    pub account_number: String,
    /// Product type.
    #[serde(rename = "type")]
    pub kind: AccountKind,
    /// Current balance in minor units. Never negative.
    pub balance: Decimal,
    /// Only active accounts may receive funds.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Returns true if the account has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The user owning an account, as joined into read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// An account together with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedAccount {
    /// The account.
    #[serde(flatten)]
    pub account: Account,
    /// The owner, absent if the user row is gone.
    pub user: Option<Owner>,
}

/// Kind of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money added to an account.
    Deposit,
    /// Money taken out of an account.
    Withdrawal,
    /// Money moved between two accounts.
    Transfer,
    /// Reversal of a transfer.
    Refund,
}

impl TransactionKind {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Refund => "refund",
        }
    }

    /// Only transfers can be reversed.
    #[must_use]
    pub const fn is_refundable(self) -> bool {
        matches!(self, Self::Transfer)
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Kind of movement.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Positive amount, two decimal places.
    pub amount: Decimal,
    /// Source account (the only account for deposits and withdrawals).
    pub account_id: AccountId,
    /// Destination account for transfers and refunds.
    pub to_account_id: Option<AccountId>,
    /// True only for transfers.
    pub refundable: bool,
    /// Set once when a transfer is reversed.
    pub refunded: bool,
    /// For refunds, the transfer being reversed.
    pub original_transaction_id: Option<TransactionId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A transaction joined with both accounts and their owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    /// The transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Source account.
    pub account: Option<OwnedAccount>,
    /// Destination account.
    pub to_account: Option<OwnedAccount>,
}

/// A transaction about to be inserted. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Kind of movement.
    pub kind: TransactionKind,
    /// Positive amount.
    pub amount: Decimal,
    /// Source account.
    pub account_id: AccountId,
    /// Destination account.
    pub to_account_id: Option<AccountId>,
    /// Eligibility for a later refund.
    pub refundable: bool,
    /// Transfer being reversed, for refunds.
    pub original_transaction_id: Option<TransactionId>,
}

impl NewTransaction {
    fn single(kind: TransactionKind, account_id: AccountId, amount: Decimal) -> Self {
        Self {
            kind,
            amount: to_money_scale(amount),
            account_id,
            to_account_id: None,
            refundable: kind.is_refundable(),
            original_transaction_id: None,
        }
    }

    /// Deposit into `to`.
    #[must_use]
    pub fn deposit(to: AccountId, amount: Decimal) -> Self {
        Self::single(TransactionKind::Deposit, to, amount)
    }

    /// Withdrawal from `from`.
    #[must_use]
    pub fn withdrawal(from: AccountId, amount: Decimal) -> Self {
        Self::single(TransactionKind::Withdrawal, from, amount)
    }

    /// Transfer from `from` to `to`.
    #[must_use]
    pub fn transfer(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        Self {
            to_account_id: Some(to),
            ..Self::single(TransactionKind::Transfer, from, amount)
        }
    }

    /// Refund record for `original`, keeping its account orientation.
    #[must_use]
    pub fn refund(original: &Transaction) -> Self {
        Self {
            to_account_id: original.to_account_id,
            original_transaction_id: Some(original.id),
            ..Self::single(TransactionKind::Refund, original.account_id, original.amount)
        }
    }
}

/// Partial update of a transaction. Only `refunded` is ever patched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    /// New value of the refunded flag.
    pub refunded: Option<bool>,
}

impl TransactionPatch {
    /// Patch marking a transfer as reversed.
    #[must_use]
    pub const fn mark_refunded() -> Self {
        Self {
            refunded: Some(true),
        }
    }
}

/// Which side of a money movement an account plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Account money leaves.
    Source,
    /// Account money arrives in.
    Destination,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// Result of a deposit, withdrawal or transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedTransaction {
    /// The committed transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Source account after the movement.
    pub account: Account,
    /// Destination account after the movement, for two-account operations.
    pub to_account: Option<Account>,
}

/// Result of a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundOutcome {
    /// The new refund record with both accounts after reversal.
    pub transaction: PostedTransaction,
    /// The reversed transfer, now flagged as refunded.
    pub original_transaction: Transaction,
}
