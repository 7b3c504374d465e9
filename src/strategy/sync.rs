//! Synchronous replay strategy
//!
//! Single-threaded replay: rows stream from `SyncReader` one at a time and
//! are applied through a `ReplaySession` in file order.
//!
//! # Memory Efficiency
//!
//! The file is never loaded whole. Memory use is O(opened labels), not
//! O(rows).

use crate::core::replay::ReplaySession;
use crate::core::traits::Repository;
use crate::io::csv_format::write_wallets_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ReplayStrategy;
use crate::types::WalletError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Synchronous replay strategy
///
/// Every call to `replay` starts a fresh label table over the shared store.
#[derive(Clone)]
pub struct SyncReplayStrategy {
    store: Arc<dyn Repository>,
}

impl SyncReplayStrategy {
    /// Create a strategy that replays into `store`
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self { store }
    }
}

impl ReplayStrategy for SyncReplayStrategy {
    fn replay(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), WalletError> {
        let session = ReplaySession::new(Arc::clone(&self.store));
        let reader = SyncReader::new(input_path)?;

        let mut applied = 0usize;
        let mut skipped = 0usize;
        for result in reader {
            match result {
                Ok(record) => match session.apply(&record) {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!(wallet = %record.wallet, error = %e, "replay row rejected");
                    }
                },
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(error = %e, "skipping replay row");
                }
            }
        }
        tracing::info!(applied, skipped, input = %input_path.display(), "replay finished");

        write_wallets_csv(&session.summaries()?, output)
    }
}
