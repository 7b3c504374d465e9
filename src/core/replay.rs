//! Replay session
//!
//! Applies replay records against a store. A session remembers which wallet
//! each label opened, so later rows can refer to the wallet by label.
//!
//! # Thread Safety
//!
//! The label table is a `DashMap`, so one session can be shared by the async
//! strategy's workers. Rows for the same label must still be applied in file
//! order, which `BatchProcessor` guarantees.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::processor::OperationProcessor;
use super::traits::Repository;
use crate::types::{
    OwnerId, Page, ReplayAction, ReplayRecord, Wallet, WalletError, WalletId, WalletSummary,
};

/// Label table plus the store it writes to
#[derive(Clone)]
pub struct ReplaySession {
    store: Arc<dyn Repository>,
    processor: OperationProcessor,
    labels: Arc<DashMap<String, WalletId>>,
}

impl ReplaySession {
    /// Create an empty session over the given store
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self {
            processor: OperationProcessor::new(Arc::clone(&store)),
            store,
            labels: Arc::new(DashMap::new()),
        }
    }

    /// Apply one replay record
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The wallet was opened or the operation committed
    /// * `Err(WalletError::DuplicateWallet)` - If the label was already opened
    /// * `Err(WalletError::InvalidWalletId)` - If the label is unknown and not a wallet id
    /// * `Err(...)` - Anything `OperationProcessor::process` can return
    pub fn apply(&self, record: &ReplayRecord) -> Result<(), WalletError> {
        match record.action {
            ReplayAction::Open => self.open(&record.wallet).map(|_| ()),
            ReplayAction::Apply(kind) => {
                let wallet_id = self.resolve(&record.wallet)?;
                let amount = record.amount.unwrap_or_default();
                self.processor.process(wallet_id, kind, amount).map(|_| ())
            }
        }
    }

    /// Create a wallet under a new label
    pub fn open(&self, label: &str) -> Result<WalletId, WalletError> {
        match self.labels.entry(label.to_string()) {
            Entry::Occupied(_) => Err(WalletError::duplicate_wallet(label)),
            Entry::Vacant(slot) => {
                let wallet = Wallet::new(OwnerId::new_v4());
                self.store.create(&wallet)?;
                tracing::debug!(label, wallet = %wallet.id, "replay wallet opened");
                slot.insert(wallet.id);
                Ok(wallet.id)
            }
        }
    }

    /// Wallet id for a label
    ///
    /// Labels opened in this session win; otherwise the label itself must be
    /// a wallet id.
    pub fn resolve(&self, label: &str) -> Result<WalletId, WalletError> {
        if let Some(id) = self.labels.get(label) {
            return Ok(*id);
        }
        label.parse()
    }

    /// Final state of every wallet opened in this session
    ///
    /// Balances and journal sizes are read back from the store.
    pub fn summaries(&self) -> Result<Vec<WalletSummary>, WalletError> {
        let mut opened: Vec<(String, WalletId)> = self
            .labels
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        opened.sort();

        opened
            .into_iter()
            .map(|(label, id)| {
                let wallet = self
                    .store
                    .find_by_id(id)?
                    .ok_or_else(|| WalletError::wallet_not_found(id))?;
                Ok(WalletSummary {
                    wallet: label,
                    balance: wallet.balance,
                    operations: self.journal_len(id)?,
                })
            })
            .collect()
    }

    fn journal_len(&self, id: WalletId) -> Result<usize, WalletError> {
        let mut total = 0usize;
        let mut offset = 0u32;
        loop {
            let page = self.store.list(id, Page::new(Page::MAX_LIMIT, offset))?;
            total += page.len();
            if page.len() < Page::MAX_LIMIT as usize {
                return Ok(total);
            }
            offset = offset.saturating_add(Page::MAX_LIMIT);
        }
    }
}
