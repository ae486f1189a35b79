//! Transaction engine.
//!
//! Executes deposits, withdrawals, transfers and refunds. Each operation runs
//! inside one unit of work: every invariant check happens before the first
//! balance write, and any failure rolls the whole unit back.

use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TransactionId};
use tracing::{debug, info, warn};

use super::error::LedgerError;
use super::invariants::{
    require_active, require_exists, require_positive_amount, require_sufficient_funds,
};
use super::store::{AccountFilter, LedgerStore, UnitOfWork};
use super::types::{
    Account, MAX_BALANCE, NewTransaction, PostedTransaction, RefundOutcome, Role, TransactionPatch,
    to_money_scale,
};

/// Executes money movements against a [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct TransactionEngine<S> {
    store: S,
}

impl<S: LedgerStore> TransactionEngine<S> {
    /// Creates an engine over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub(crate) const fn store(&self) -> &S {
        &self.store
    }

    /// Adds `amount` to account `to`.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound`, `AccountInactive`, or a storage error.
    pub async fn deposit(
        &self,
        to: AccountId,
        amount: Decimal,
    ) -> Result<PostedTransaction, LedgerError> {
        let amount = require_positive_amount(amount)?;
        let mut unit = self.store.begin().await?;
        let result = apply_deposit(&mut unit, to, amount).await;
        let posted = finish(unit, result).await?;
        info!(
            transaction_id = %posted.transaction.id,
            account_id = %to,
            %amount,
            balance = %posted.account.balance,
            "deposit committed"
        );
        Ok(posted)
    }

    /// Takes `amount` out of account `from`.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound`, `InsufficientFunds`, or a storage error.
    pub async fn withdraw(
        &self,
        from: AccountId,
        amount: Decimal,
    ) -> Result<PostedTransaction, LedgerError> {
        let amount = require_positive_amount(amount)?;
        let mut unit = self.store.begin().await?;
        let result = apply_withdrawal(&mut unit, from, amount).await;
        let posted = finish(unit, result).await?;
        info!(
            transaction_id = %posted.transaction.id,
            account_id = %from,
            %amount,
            balance = %posted.account.balance,
            "withdrawal committed"
        );
        Ok(posted)
    }

    /// Moves `amount` from account `from` to account `to`.
    ///
    /// Only the destination has to be active.
    ///
    /// # Errors
    ///
    /// `SameAccountTransfer`, `InvalidAmount`, `AccountNotFound`,
    /// `InsufficientFunds`, `AccountInactive`, or a storage error.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<PostedTransaction, LedgerError> {
        if from == to {
            return Err(LedgerError::SameAccountTransfer(from));
        }
        let amount = require_positive_amount(amount)?;
        let mut unit = self.store.begin().await?;
        let result = apply_transfer(&mut unit, from, to, amount).await;
        let posted = finish(unit, result).await?;
        info!(
            transaction_id = %posted.transaction.id,
            %from,
            %to,
            %amount,
            "transfer committed"
        );
        Ok(posted)
    }

    /// Reverses a transfer and records the reversal.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound`, `RefundNotAllowed`, `AlreadyRefunded`,
    /// `AccountNotFound`, `AccountInactive`, `InsufficientFunds`, or a storage error.
    pub async fn refund(&self, transaction_id: TransactionId) -> Result<RefundOutcome, LedgerError> {
        let mut unit = self.store.begin().await?;
        let result = apply_refund(&mut unit, transaction_id).await;
        let outcome = finish(unit, result).await?;
        info!(
            refund_id = %outcome.transaction.transaction.id,
            %transaction_id,
            "refund committed"
        );
        Ok(outcome)
    }
}

/// Commits the unit on success, rolls it back on failure.
async fn finish<U: UnitOfWork, T>(unit: U, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(err) => {
            debug!(error = %err, "rolling back");
            if let Err(rollback_err) = unit.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn load_account<U: UnitOfWork>(
    unit: &mut U,
    id: AccountId,
    role: Role,
) -> Result<Account, LedgerError> {
    let account = require_exists(
        unit.find_account(&AccountFilter::by_id(id)).await?,
        role,
        id,
    )?;
    if account.is_deleted() {
        warn!(account_id = %id, %role, "operating on a soft-deleted account");
    }
    Ok(account)
}

/// Loads two distinct accounts, locking them in ascending id order.
async fn load_pair<U: UnitOfWork>(
    unit: &mut U,
    from: AccountId,
    to: AccountId,
) -> Result<(Account, Account), LedgerError> {
    if from < to {
        let source = load_account(unit, from, Role::Source).await?;
        let destination = load_account(unit, to, Role::Destination).await?;
        Ok((source, destination))
    } else {
        let destination = load_account(unit, to, Role::Destination).await?;
        let source = load_account(unit, from, Role::Source).await?;
        Ok((source, destination))
    }
}

async fn write_balance<U: UnitOfWork>(
    unit: &mut U,
    account: &mut Account,
    balance: Decimal,
) -> Result<(), LedgerError> {
    let balance = to_money_scale(balance);
    let changed = unit
        .update_account_balance(account.id, account.balance, balance)
        .await?;
    if changed == 0 {
        return Err(LedgerError::ConcurrentModification(account.id));
    }
    account.balance = balance;
    Ok(())
}

/// Balance of `account` after receiving `amount`, capped at [`MAX_BALANCE`].
fn credited(account: &Account, amount: Decimal) -> Result<Decimal, LedgerError> {
    account
        .balance
        .checked_add(amount)
        .filter(|balance| *balance <= MAX_BALANCE)
        .ok_or(LedgerError::InvalidAmount(amount))
}

async fn apply_deposit<U: UnitOfWork>(
    unit: &mut U,
    to: AccountId,
    amount: Decimal,
) -> Result<PostedTransaction, LedgerError> {
    let mut account = load_account(unit, to, Role::Destination).await?;
    require_active(&account, Role::Destination)?;

    let balance = credited(&account, amount)?;
    write_balance(unit, &mut account, balance).await?;
    let transaction = unit
        .insert_transaction(NewTransaction::deposit(to, amount))
        .await?;
    Ok(PostedTransaction {
        transaction,
        account,
        to_account: None,
    })
}

async fn apply_withdrawal<U: UnitOfWork>(
    unit: &mut U,
    from: AccountId,
    amount: Decimal,
) -> Result<PostedTransaction, LedgerError> {
    let mut account = load_account(unit, from, Role::Source).await?;
    require_sufficient_funds(&account, amount)?;

    let balance = account.balance - amount;
    write_balance(unit, &mut account, balance).await?;
    let transaction = unit
        .insert_transaction(NewTransaction::withdrawal(from, amount))
        .await?;
    Ok(PostedTransaction {
        transaction,
        account,
        to_account: None,
    })
}

async fn apply_transfer<U: UnitOfWork>(
    unit: &mut U,
    from: AccountId,
    to: AccountId,
    amount: Decimal,
) -> Result<PostedTransaction, LedgerError> {
    let (mut source, mut destination) = load_pair(unit, from, to).await?;
    require_sufficient_funds(&source, amount)?;
    require_active(&destination, Role::Destination)?;

    let debited = source.balance - amount;
    let credited = credited(&destination, amount)?;
    write_balance(unit, &mut source, debited).await?;
    write_balance(unit, &mut destination, credited).await?;
    let transaction = unit
        .insert_transaction(NewTransaction::transfer(from, to, amount))
        .await?;
    Ok(PostedTransaction {
        transaction,
        account: source,
        to_account: Some(destination),
    })
}

async fn apply_refund<U: UnitOfWork>(
    unit: &mut U,
    transaction_id: TransactionId,
) -> Result<RefundOutcome, LedgerError> {
    let detail = unit
        .find_transaction(transaction_id)
        .await?
        .ok_or(LedgerError::TransactionNotFound(transaction_id))?;
    let original = detail.transaction;

    if !original.refundable {
        return Err(LedgerError::RefundNotAllowed(original.id));
    }
    if original.refunded {
        return Err(LedgerError::AlreadyRefunded(original.id));
    }
    let to = original
        .to_account_id
        .ok_or(LedgerError::RefundNotAllowed(original.id))?;
    require_exists(detail.to_account, Role::Destination, to)?;
    require_exists(detail.account, Role::Source, original.account_id)?;

    let (mut source, mut destination) = load_pair(unit, original.account_id, to).await?;
    require_active(&source, Role::Source)?;
    require_active(&destination, Role::Destination)?;
    require_sufficient_funds(&destination, original.amount)?;

    let restored = credited(&source, original.amount)?;
    let reversed = destination.balance - original.amount;
    write_balance(unit, &mut source, restored).await?;
    write_balance(unit, &mut destination, reversed).await?;

    let original = unit
        .update_transaction(original.id, TransactionPatch::mark_refunded())
        .await?
        .ok_or(LedgerError::AlreadyRefunded(original.id))?;
    let refund = unit
        .insert_transaction(NewTransaction::refund(&original))
        .await?;

    Ok(RefundOutcome {
        transaction: PostedTransaction {
            transaction: refund,
            account: source,
            to_account: Some(destination),
        },
        original_transaction: original,
    })
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
