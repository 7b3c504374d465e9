//! Asynchronous batch replay strategy
//!
//! Multi-threaded replay: rows are read in batches with `AsyncReader`, and
//! each batch is applied by a `BatchProcessor` that runs different labels in
//! parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncReplayStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (label partitioning + blocking tasks)
//!         └── ReplaySession
//!             └── OperationProcessor → Arc<dyn Repository>
//! ```
//!
//! # Ordering
//!
//! Batches are applied one after another, and within a batch each label's
//! rows run in order on a single task, so every label sees its rows in file
//! order even when they span batches.

use crate::core::batch_processor::BatchProcessor;
use crate::core::replay::ReplaySession;
use crate::core::traits::Repository;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_wallets_csv;
use crate::strategy::ReplayStrategy;
use crate::types::WalletError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of rows per batch
    pub batch_size: usize,
    /// Number of worker threads, and of labels applied at once
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig; zero values fall back to the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid concurrency, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch replay strategy
#[derive(Clone)]
pub struct AsyncReplayStrategy {
    store: Arc<dyn Repository>,
    config: BatchConfig,
}

impl AsyncReplayStrategy {
    /// Create a strategy that replays into `store`
    ///
    /// # Arguments
    ///
    /// * `store` - Store every replayed row is applied to
    /// * `config` - BatchConfig with batch_size and max_concurrent_batches
    pub fn new(store: Arc<dyn Repository>, config: BatchConfig) -> Self {
        Self { store, config }
    }

    /// Batch configuration in use
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}

impl ReplayStrategy for AsyncReplayStrategy {
    /// Replay an input file in batches
    ///
    /// Builds its own multi-threaded tokio runtime, so it must not be called
    /// from inside another runtime.
    fn replay(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), WalletError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| WalletError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let session = ReplaySession::new(Arc::clone(&self.store));

        runtime.block_on(async {
            let processor = BatchProcessor::new(session.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| WalletError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;

            // csv-async reads through the futures io traits.
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut applied = 0usize;
            let mut rejected = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Finish this batch before reading the next to keep label order.
                let results = processor.process_batch(batch).await;
                let failed = results.iter().filter(|r| r.result.is_err()).count();
                applied += results.len() - failed;
                rejected += failed;
            }
            tracing::info!(applied, rejected, input = %input_path.display(), "replay finished");

            Ok::<(), WalletError>(())
        })?;

        write_wallets_csv(&session.summaries()?, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn strategy(config: BatchConfig) -> AsyncReplayStrategy {
        AsyncReplayStrategy::new(Arc::new(MemoryStore::new()), config)
    }

    #[test]
    fn test_batch_config_zero_values_fall_back() {
        let default = BatchConfig::default();
        assert_eq!(BatchConfig::new(0, 0), default);
        assert_eq!(BatchConfig::new(10, 0).batch_size, 10);
        assert_eq!(BatchConfig::new(0, 3).max_concurrent_batches, 3);
    }

    #[test]
    fn test_async_strategy_replays_file() {
        let file = create_temp_csv(
            "type,wallet,amount\n\
             open,alice,\n\
             open,bob,\n\
             deposit,alice,100\n\
             deposit,bob,200\n\
             withdraw,alice,40\n",
        );
        let mut output = Vec::new();

        strategy(BatchConfig::default())
            .replay(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "wallet,balance,operations\nalice,60,2\nbob,200,1\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let mut output = Vec::new();

        let result = strategy(BatchConfig::default()).replay(Path::new("nonexistent.csv"), &mut output);
        match result {
            Err(WalletError::IoError { message }) => {
                assert!(message.contains("Failed to open file"))
            }
            other => panic!("expected IoError, got {:?}", other),
        }
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        // A batch size of 2 splits every label's rows across batches.
        let file = create_temp_csv(
            "type,wallet,amount\n\
             open,a,\n\
             open,b,\n\
             deposit,a,100\n\
             deposit,b,50\n\
             withdraw,a,30\n\
             deposit,b,25\n\
             withdraw,a,70\n",
        );
        let mut output = Vec::new();

        strategy(BatchConfig::new(2, 4))
            .replay(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "wallet,balance,operations\na,0,3\nb,75,2\n"
        );
    }
}
