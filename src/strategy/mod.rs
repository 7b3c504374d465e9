//! Replay strategy module
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and operation processing. This allows the
//! synchronous and asynchronous batch implementations to be selected at runtime.

use crate::cli::StrategyType;
use crate::core::traits::Repository;
use crate::types::WalletError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncReplayStrategy, BatchConfig};
pub use sync::SyncReplayStrategy;

/// Replay strategy trait for complete replay pipelines
///
/// Each strategy reads replay rows from a CSV file, applies them to its store
/// and writes a summary of every wallet the file opened.
pub trait ReplayStrategy: Send + Sync {
    /// Replay an input file and write the wallet summaries to output
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the replay CSV file
    /// * `output` - Writer receiving the `wallet,balance,operations` CSV
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the file was replayed, even if some rows were rejected
    /// * `Err(WalletError)` if a fatal error occurred (unreadable input,
    ///   store failure while summarizing, output write failure)
    ///
    /// Rejected or malformed rows are logged and skipped; they never abort
    /// the replay.
    fn replay(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), WalletError>;
}

/// Create a replay strategy over a store
///
/// # Arguments
///
/// * `strategy_type` - Sync or Async
/// * `store` - Store every replayed row is applied to
/// * `config` - Batch configuration for the async strategy (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    store: Arc<dyn Repository>,
    config: Option<BatchConfig>,
) -> Box<dyn ReplayStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncReplayStrategy::new(store)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncReplayStrategy::new(store, config))
        }
    }
}
