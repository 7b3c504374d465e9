//! Wallet Ledger Library
//!
//! # Overview
//!
//! A wallet ledger that applies deposits and withdrawals atomically: the
//! balance update and its journal entry commit together or not at all, and
//! concurrent operations on one wallet never lose an update or overdraw it.
//!
//! # Architecture
//!
//! - [`types`] - Wallets, operations, replay records, and errors
//! - [`core`] - Business logic:
//!   - [`core::traits`] - Storage capability traits
//!   - [`core::processor`] - Atomic operation processing
//!   - [`core::service`] - Validating facade for external callers
//!   - [`core::replay`] / [`core::batch_processor`] - CSV replay support
//! - [`store`] - In-memory and SQLite storage engines
//! - [`io`] - Replay CSV reading and summary output
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`] - Command-line parsing and dispatch
//! - [`logging`] - Tracing subscriber setup
//!
//! # Invariants
//!
//! - A balance is never negative.
//! - A wallet's balance always equals the signed sum of its journal.
//! - Every journal entry's `balance_after` is the balance its operation wrote.

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod store;
pub mod strategy;
pub mod types;

pub use crate::core::{OperationProcessor, OperationReceipt, OperationRequest, Repository, WalletService};
pub use store::{open_store, MemoryStore, SqliteStore, StoreConfig};
pub use types::{
    ErrorResponse, Operation, OperationKind, OwnerId, Page, Wallet, WalletError, WalletId,
};
