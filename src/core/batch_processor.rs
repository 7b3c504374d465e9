//! Batch processing with label-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which applies a batch of
//! replay records concurrently while preserving the file order of each
//! label's rows.
//!
//! # Design
//!
//! A batch is partitioned by wallet label. Each label's rows run in order on
//! one tokio blocking task, since the processor blocks on row locks and
//! storage I/O. Different labels run in parallel.
//!
//! ```text
//! BatchProcessor
//!     └── ReplaySession (label table + OperationProcessor)
//! ```

use std::collections::HashMap;

use super::replay::ReplaySession;
use crate::types::{ReplayRecord, WalletError};

/// Result of applying a single replay record
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The record that was applied
    pub record: ReplayRecord,

    /// Outcome of applying it
    pub result: Result<(), WalletError>,
}

/// Batch processor with label-based partitioning
#[derive(Clone)]
pub struct BatchProcessor {
    session: ReplaySession,
}

impl BatchProcessor {
    /// Create a new BatchProcessor over a replay session
    pub fn new(session: ReplaySession) -> Self {
        Self { session }
    }

    /// Partition a batch of records by wallet label
    ///
    /// # Guarantees
    ///
    /// - Each record appears in exactly one sub-batch
    /// - Records for each label keep their original order
    pub fn partition_by_label(
        &self,
        batch: Vec<ReplayRecord>,
    ) -> HashMap<String, Vec<ReplayRecord>> {
        let mut label_batches: HashMap<String, Vec<ReplayRecord>> = HashMap::new();

        for record in batch {
            label_batches
                .entry(record.wallet.clone())
                .or_default()
                .push(record);
        }

        label_batches
    }

    /// Apply one label's records sequentially
    ///
    /// Every record is attempted; a failure does not stop the rest. Results
    /// come back in input order.
    pub fn process_label_records(&self, records: Vec<ReplayRecord>) -> Vec<ProcessingResult> {
        records
            .into_iter()
            .map(|record| {
                let result = self.session.apply(&record);
                if let Err(e) = &result {
                    tracing::warn!(wallet = %record.wallet, error = %e, "replay row rejected");
                }
                ProcessingResult { record, result }
            })
            .collect()
    }

    /// Apply a batch with label-based partitioning
    ///
    /// Each label's records run on their own blocking task; the call returns
    /// once every task has finished. Result order across labels is
    /// unspecified.
    pub async fn process_batch(&self, batch: Vec<ReplayRecord>) -> Vec<ProcessingResult> {
        let label_batches = self.partition_by_label(batch);

        let mut tasks = Vec::with_capacity(label_batches.len());
        for (_label, records) in label_batches {
            let processor = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                processor.process_label_records(records)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(label_results) => results.extend(label_results),
                Err(e) => tracing::error!(error = %e, "replay task panicked"),
            }
        }

        results
    }
}
