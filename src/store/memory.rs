//! Thread-safe in-memory wallet store
//!
//! This module provides the `MemoryStore` struct, which keeps wallet records
//! and their journals in concurrent maps and implements the repository
//! contract with real per-row locking.
//!
//! # Design
//!
//! Each wallet row owns its own `parking_lot` mutex, the row lock. The
//! `DashMap` shard locks are only ever held for the instant it takes to clone
//! a row lock handle or copy a record, so operations on different wallets
//! never wait on each other for the duration of a unit of work.
//!
//! A transaction stages its writes privately and publishes them on commit
//! while still holding the row lock. The journal entry for the wallet stays
//! locked while its row is updated, so a reader that sees the new balance
//! then lists the journal finds the matching entries. Dropping a
//! transaction discards the staged writes and releases the lock.

use super::row_lock::{held_row, second_lock_error, LockedRow, RowLock};
use crate::core::traits::{OperationJournal, StoreTransaction, WalletStore};
use crate::types::{Operation, OwnerId, Page, Wallet, WalletError, WalletId};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on how long a transaction waits for a row lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct WalletRow {
    /// Held by at most one open transaction
    lock: Arc<RowLock>,
    /// Last committed record
    wallet: Wallet,
}

#[derive(Debug)]
struct Shared {
    rows: DashMap<WalletId, WalletRow>,
    journal: DashMap<WalletId, Vec<Operation>>,
    lock_timeout: Duration,
}

/// In-memory implementation of the wallet repository
///
/// Cloning is cheap and every clone addresses the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Create an empty store with the default lock timeout
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty store with a custom lock timeout
    ///
    /// # Arguments
    ///
    /// * `lock_timeout` - How long `find_by_id_for_update` waits for a row
    ///   held by another transaction before failing with `Timeout`
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                rows: DashMap::new(),
                journal: DashMap::new(),
                lock_timeout,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletStore for MemoryStore {
    fn create(&self, wallet: &Wallet) -> Result<(), WalletError> {
        match self.shared.rows.entry(wallet.id) {
            Entry::Occupied(_) => Err(WalletError::duplicate_wallet(wallet.id)),
            Entry::Vacant(slot) => {
                slot.insert(WalletRow {
                    lock: Arc::new(RowLock::default()),
                    wallet: wallet.clone(),
                });
                Ok(())
            }
        }
    }

    fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, WalletError> {
        Ok(self.shared.rows.get(&id).map(|row| row.wallet.clone()))
    }

    fn find_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Wallet>, WalletError> {
        let mut wallets: Vec<Wallet> = self
            .shared
            .rows
            .iter()
            .filter(|row| row.wallet.owner_id == owner_id)
            .map(|row| row.wallet.clone())
            .collect();
        wallets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(wallets)
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction>, WalletError> {
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            held: None,
        }))
    }
}

impl OperationJournal for MemoryStore {
    fn list(&self, wallet_id: WalletId, page: Page) -> Result<Vec<Operation>, WalletError> {
        Ok(self
            .shared
            .journal
            .get(&wallet_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .skip(page.offset() as usize)
                    .take(page.limit() as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Unit of work against a `MemoryStore`
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    held: Option<LockedRow>,
}

impl StoreTransaction for MemoryTransaction {
    fn find_by_id_for_update(&mut self, id: WalletId) -> Result<Option<Wallet>, WalletError> {
        if let Some(held) = &self.held {
            if held.wallet.id != id {
                return Err(second_lock_error(held));
            }
            return Ok(Some(held.current()));
        }

        // Clone the handle so the shard lock is released before we block.
        let lock = match self.shared.rows.get(&id) {
            Some(row) => Arc::clone(&row.lock),
            None => return Ok(None),
        };
        let guard = lock.acquire_for(id, self.shared.lock_timeout)?;

        // Re-read under the lock: the previous holder may have committed.
        let wallet = match self.shared.rows.get(&id) {
            Some(row) => row.wallet.clone(),
            None => return Ok(None),
        };

        self.held = Some(LockedRow::new(wallet.clone(), guard));
        Ok(Some(wallet))
    }

    fn update_balance(
        &mut self,
        id: WalletId,
        new_balance: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), WalletError> {
        held_row(&mut self.held, id)?.stage_balance(new_balance, updated_at)
    }

    fn append(&mut self, operation: &Operation) -> Result<(), WalletError> {
        held_row(&mut self.held, operation.wallet_id)?.stage_operation(operation);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), WalletError> {
        let MemoryTransaction { shared, held } = *self;
        let Some(held) = held else {
            return Ok(());
        };
        if held.is_clean() {
            return Ok(());
        }
        let id = held.wallet.id;

        // Hold the journal entry while the row changes so readers never see
        // the balance ahead of its journal.
        let mut journal = shared.journal.entry(id).or_default();
        if let Some((balance, updated_at)) = held.staged_balance {
            let mut row = shared
                .rows
                .get_mut(&id)
                .ok_or_else(|| WalletError::persistence(format!("wallet {} vanished", id)))?;
            row.wallet.balance = balance;
            row.wallet.updated_at = updated_at;
        }
        journal.extend(held.staged_operations.iter().cloned());
        drop(journal);

        // The row lock is released only after both writes are visible.
        drop(held);
        Ok(())
    }
}
