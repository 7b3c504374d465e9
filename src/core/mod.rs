//! Core business logic module
//!
//! This module contains the wallet ledger components:
//! - `traits` - Storage capability traits
//! - `processor` - Atomic balance-changing operations
//! - `service` - Input validation facade
//! - `replay` - Label table for CSV replays
//! - `batch_processor` - Label-partitioned concurrent replay

pub mod batch_processor;
pub mod processor;
pub mod replay;
pub mod service;
pub mod traits;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use processor::OperationProcessor;
pub use replay::ReplaySession;
pub use service::{OperationReceipt, OperationRequest, WalletService};
pub use traits::{OperationJournal, Repository, StoreTransaction, WalletStore};
