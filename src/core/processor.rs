//! Atomic operation processing
//!
//! This module provides the `OperationProcessor` struct, which applies a
//! deposit or withdrawal to one wallet as a single unit of work: lock the row,
//! check, write the balance, journal the operation and commit.
//!
//! # Design
//!
//! The processor owns no state besides a handle to the repository. It can be
//! cloned and shared across threads; every call opens its own transaction,
//! so concurrency control is entirely the store's row lock.
//!
//! ```text
//! OperationProcessor
//!     └── Arc<dyn Repository>
//!           ├── begin() -> StoreTransaction
//!           │     ├── find_by_id_for_update (row lock)
//!           │     ├── update_balance
//!           │     ├── append
//!           │     └── commit
//!           └── (drop without commit = rollback)
//! ```

use std::sync::Arc;

use crate::core::traits::Repository;
use crate::types::{timestamp_now, Operation, OperationKind, WalletError, WalletId};

/// Applies balance-changing operations atomically
///
/// # Thread Safety
///
/// Safe to clone and call from many threads at once. Two calls on the same
/// wallet are serialized by the store's row lock; calls on different wallets
/// proceed independently.
#[derive(Clone)]
pub struct OperationProcessor {
    /// Storage engine shared with the rest of the application
    store: Arc<dyn Repository>,
}

impl OperationProcessor {
    /// Create a new processor over the given store
    ///
    /// # Arguments
    ///
    /// * `store` - Shared repository handle
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self { store }
    }

    /// Apply one operation to a wallet
    ///
    /// # Arguments
    ///
    /// * `wallet_id` - Target wallet
    /// * `kind` - Deposit or withdrawal
    /// * `amount` - Strictly positive magnitude in minor units
    ///
    /// # Returns
    ///
    /// * `Ok(i64)` - The balance written by this operation
    /// * `Err(WalletError::InvalidAmount)` - If `amount <= 0`; storage is not touched
    /// * `Err(WalletError::WalletNotFound)` - If no wallet has this id
    /// * `Err(WalletError::InsufficientFunds)` - If a withdrawal exceeds the locked balance
    /// * `Err(WalletError::BalanceOverflow)` - If a deposit would overflow the balance
    /// * `Err(WalletError::Timeout)` - If the row lock could not be taken in time
    /// * `Err(WalletError::PersistenceFailure)` - If the write or commit failed;
    ///   everything was rolled back
    ///
    /// No error leaves a partial write behind.
    #[tracing::instrument(level = "debug", skip_all, fields(wallet = %wallet_id, kind = %kind, amount = amount))]
    pub fn process(
        &self,
        wallet_id: WalletId,
        kind: OperationKind,
        amount: i64,
    ) -> Result<i64, WalletError> {
        let result = self.apply(wallet_id, kind, amount);
        match &result {
            Ok(balance_after) => {
                tracing::info!(balance_after, "operation applied");
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "operation rolled back");
            }
            Err(e) => {
                tracing::debug!(error = %e, "operation rejected");
            }
        }
        result
    }

    fn apply(
        &self,
        wallet_id: WalletId,
        kind: OperationKind,
        amount: i64,
    ) -> Result<i64, WalletError> {
        if amount <= 0 {
            return Err(WalletError::invalid_amount(amount));
        }

        // Dropping `tx` on any early return rolls it back and frees the row.
        let mut tx = self.store.begin()?;
        let wallet = tx
            .find_by_id_for_update(wallet_id)?
            .ok_or_else(|| WalletError::wallet_not_found(wallet_id))?;

        let new_balance = match kind {
            OperationKind::Deposit => wallet
                .balance
                .checked_add(amount)
                .ok_or_else(|| WalletError::balance_overflow(wallet_id, wallet.balance, amount))?,
            OperationKind::Withdraw => {
                if wallet.balance < amount {
                    return Err(WalletError::insufficient_funds(
                        wallet_id,
                        wallet.balance,
                        amount,
                    ));
                }
                wallet.balance - amount
            }
        };

        // Never move a wallet's clock backwards.
        let now = timestamp_now().max(wallet.updated_at);

        tx.update_balance(wallet_id, new_balance, now)?;
        tx.append(&Operation::new(wallet_id, kind, amount, new_balance, now))?;
        tx.commit()?;

        Ok(new_balance)
    }
}
