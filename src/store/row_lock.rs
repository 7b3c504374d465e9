//! Per-wallet row locks shared by the storage engines
//!
//! A `RowLock` is an exclusive lock with a bounded wait. Its guard is an
//! owned value, so a transaction holding it can move between threads.
//! `LockedRow` is what a transaction keeps while it holds a wallet: the
//! record read under the lock and the writes staged for commit.

use crate::types::{Operation, Wallet, WalletError, WalletId};
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exclusive row lock with a bounded wait
#[derive(Debug, Default)]
pub(crate) struct RowLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl RowLock {
    /// Take the lock, waiting at most `timeout` for the current holder
    pub(crate) fn acquire(self: &Arc<Self>, timeout: Duration) -> Option<RowGuard> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock();
        while *held {
            if self.released.wait_until(&mut held, deadline).timed_out() && *held {
                return None;
            }
        }
        *held = true;
        Some(RowGuard {
            lock: Arc::clone(self),
        })
    }

    /// Take the lock for `id`, failing with `Timeout` after `timeout`
    pub(crate) fn acquire_for(
        self: &Arc<Self>,
        id: WalletId,
        timeout: Duration,
    ) -> Result<RowGuard, WalletError> {
        let started = Instant::now();
        let guard = self
            .acquire(timeout)
            .ok_or_else(|| WalletError::timeout(id, started.elapsed()))?;
        tracing::trace!(wallet = %id, waited_us = started.elapsed().as_micros() as u64, "row lock acquired");
        Ok(guard)
    }
}

/// Releases the row lock when dropped
#[derive(Debug)]
pub(crate) struct RowGuard {
    lock: Arc<RowLock>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        *self.lock.held.lock() = false;
        self.lock.released.notify_one();
    }
}

/// A wallet held by a transaction, plus the writes staged under its lock
#[derive(Debug)]
pub(crate) struct LockedRow {
    /// The record as read once the lock was taken
    pub(crate) wallet: Wallet,
    pub(crate) staged_balance: Option<(i64, DateTime<Utc>)>,
    pub(crate) staged_operations: Vec<Operation>,
    _guard: RowGuard,
}

impl LockedRow {
    pub(crate) fn new(wallet: Wallet, guard: RowGuard) -> Self {
        LockedRow {
            wallet,
            staged_balance: None,
            staged_operations: Vec::new(),
            _guard: guard,
        }
    }

    /// The wallet as this transaction sees it, staged balance included
    pub(crate) fn current(&self) -> Wallet {
        let mut wallet = self.wallet.clone();
        if let Some((balance, updated_at)) = self.staged_balance {
            wallet.balance = balance;
            wallet.updated_at = updated_at;
        }
        wallet
    }

    pub(crate) fn stage_balance(
        &mut self,
        new_balance: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), WalletError> {
        if new_balance < 0 {
            return Err(WalletError::persistence(format!(
                "refusing to store negative balance {} for wallet {}",
                new_balance, self.wallet.id
            )));
        }
        self.staged_balance = Some((new_balance, updated_at));
        Ok(())
    }

    pub(crate) fn stage_operation(&mut self, operation: &Operation) {
        self.staged_operations.push(operation.clone());
    }

    /// Nothing to write on commit
    pub(crate) fn is_clean(&self) -> bool {
        self.staged_balance.is_none() && self.staged_operations.is_empty()
    }
}

/// The row held for `id`, or `PersistenceFailure` if the transaction holds none
pub(crate) fn held_row(
    held: &mut Option<LockedRow>,
    id: WalletId,
) -> Result<&mut LockedRow, WalletError> {
    match held.as_mut() {
        Some(row) if row.wallet.id == id => Ok(row),
        _ => Err(WalletError::persistence(format!(
            "wallet {} is not locked by this transaction",
            id
        ))),
    }
}

/// A transaction locks one wallet at most
pub(crate) fn second_lock_error(held: &LockedRow) -> WalletError {
    WalletError::persistence(format!(
        "transaction already holds the lock on wallet {}",
        held.wallet.id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerId;
    use std::thread;

    #[test]
    fn test_lock_is_exclusive_until_guard_drops() {
        let lock = Arc::new(RowLock::default());

        let guard = lock.acquire(Duration::from_millis(10)).unwrap();
        assert!(lock.acquire(Duration::from_millis(20)).is_none());

        drop(guard);
        assert!(lock.acquire(Duration::from_millis(10)).is_some());
    }

    #[test]
    fn test_waiter_wakes_when_holder_releases() {
        let lock = Arc::new(RowLock::default());
        let guard = lock.acquire(Duration::ZERO).unwrap();

        let waiter = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || lock.acquire(Duration::from_secs(5)).is_some())
        };
        thread::sleep(Duration::from_millis(20));
        drop(guard);

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_acquire_for_reports_timeout() {
        let lock = Arc::new(RowLock::default());
        let id = WalletId::new_v4();
        let _guard = lock.acquire(Duration::ZERO).unwrap();

        let result = lock.acquire_for(id, Duration::from_millis(10));
        assert!(matches!(result, Err(WalletError::Timeout { wallet, .. }) if wallet == id));
    }

    #[test]
    fn test_locked_row_stages_writes() {
        let lock = Arc::new(RowLock::default());
        let wallet = Wallet::new(OwnerId::new_v4());
        let mut row = LockedRow::new(wallet.clone(), lock.acquire(Duration::ZERO).unwrap());
        assert!(row.is_clean());

        let later = wallet.updated_at + chrono::Duration::seconds(1);
        row.stage_balance(25, later).unwrap();
        assert_eq!(row.current().balance, 25);
        assert_eq!(row.current().updated_at, later);
        assert_eq!(row.wallet, wallet);

        assert!(matches!(
            row.stage_balance(-1, later),
            Err(WalletError::PersistenceFailure { .. })
        ));
    }

    #[test]
    fn test_held_row_checks_wallet() {
        let lock = Arc::new(RowLock::default());
        let wallet = Wallet::new(OwnerId::new_v4());
        let mut held = Some(LockedRow::new(
            wallet.clone(),
            lock.acquire(Duration::ZERO).unwrap(),
        ));

        assert!(held_row(&mut held, wallet.id).is_ok());
        assert!(held_row(&mut held, WalletId::new_v4()).is_err());
        assert!(held_row(&mut None, wallet.id).is_err());
    }
}
