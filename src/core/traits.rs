//! Repository traits for wallet storage and the operation journal
//!
//! This module defines the small capability set the operation processor
//! depends on. Any storage engine that honours the locking and commit
//! contract below can be plugged in behind `Arc<dyn Repository>`.

use crate::types::{Operation, OwnerId, Page, Wallet, WalletError, WalletId};
use chrono::{DateTime, Utc};

/// Keyed storage of wallet records
///
/// Reads through this trait take no row lock and may observe a balance that
/// an in-flight transaction is about to replace.
pub trait WalletStore: Send + Sync {
    /// Insert a new wallet record
    ///
    /// Fails with `DuplicateWallet` if the id is already taken.
    fn create(&self, wallet: &Wallet) -> Result<(), WalletError>;

    /// Read a wallet without locking it
    fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, WalletError>;

    /// All wallets of an owner, newest first
    fn find_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Wallet>, WalletError>;

    /// Open a unit of work
    ///
    /// Nothing written through the returned transaction is visible to other
    /// callers until `commit` succeeds. Dropping it without committing rolls
    /// every staged write back.
    fn begin(&self) -> Result<Box<dyn StoreTransaction>, WalletError>;
}

/// Append-only record of accepted mutations
pub trait OperationJournal: Send + Sync {
    /// Journal entries of a wallet ordered by creation time, newest first
    fn list(&self, wallet_id: WalletId, page: Page) -> Result<Vec<Operation>, WalletError>;
}

/// An open unit of work against the store
///
/// A transaction locks at most one wallet row, taken by
/// `find_by_id_for_update` and held until commit or drop.
pub trait StoreTransaction: Send {
    /// Read a wallet and take its row lock
    ///
    /// Blocks while another open transaction holds the same row, up to the
    /// store's lock timeout, then fails with `Timeout`. The returned record
    /// cannot go stale before this transaction ends.
    fn find_by_id_for_update(&mut self, id: WalletId) -> Result<Option<Wallet>, WalletError>;

    /// Stage a new balance for the locked wallet
    fn update_balance(
        &mut self,
        id: WalletId,
        new_balance: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), WalletError>;

    /// Stage a journal entry for the locked wallet
    fn append(&mut self, operation: &Operation) -> Result<(), WalletError>;

    /// Make every staged write durable as one unit
    ///
    /// On failure nothing staged becomes visible and the error is a
    /// `PersistenceFailure`.
    fn commit(self: Box<Self>) -> Result<(), WalletError>;
}

/// Everything the processor and the service need from a storage engine
pub trait Repository: WalletStore + OperationJournal {}

impl<T: WalletStore + OperationJournal> Repository for T {}
