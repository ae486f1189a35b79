//! Account invariant checks.
//!
//! Pure predicates evaluated by the transaction engine before any balance
//! write. None of them touch storage.

use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::error::LedgerError;
use super::types::{Account, MAX_BALANCE, MONEY_SCALE, Role, to_money_scale};

/// Ensures `amount` is strictly positive, no larger than [`MAX_BALANCE`], and
/// has at most two decimal places.
///
/// Trailing zeros do not count, so `1.500` is accepted and returned as `1.50`.
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` otherwise.
pub fn require_positive_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO || amount > MAX_BALANCE || amount.normalize().scale() > MONEY_SCALE
    {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(to_money_scale(amount))
}

/// Ensures `account` can be debited by `amount` without going negative.
///
/// # Errors
///
/// Returns `LedgerError::InsufficientFunds` if `balance < amount`.
pub fn require_sufficient_funds(account: &Account, amount: Decimal) -> Result<(), LedgerError> {
    if account.balance < amount {
        return Err(LedgerError::InsufficientFunds {
            account: account.id,
            balance: account.balance,
            requested: amount,
        });
    }
    Ok(())
}

/// Ensures `account` is active.
///
/// # Errors
///
/// Returns `LedgerError::AccountInactive` tagged with `role`.
pub fn require_active(account: &Account, role: Role) -> Result<(), LedgerError> {
    if !account.active {
        return Err(LedgerError::AccountInactive {
            role,
            id: account.id,
        });
    }
    Ok(())
}

/// Unwraps a looked-up account.
///
/// # Errors
///
/// Returns `LedgerError::AccountNotFound` tagged with `role` if absent.
pub fn require_exists<T>(account: Option<T>, role: Role, id: AccountId) -> Result<T, LedgerError> {
    account.ok_or(LedgerError::AccountNotFound { role, id })
}
