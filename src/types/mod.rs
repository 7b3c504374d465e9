//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `wallet`: Wallet records and identifiers
//! - `operation`: Operation kinds, journal entries, and pagination
//! - `replay`: Replay file records and per-wallet results
//! - `error`: Error types for the wallet ledger

pub mod error;
pub mod operation;
pub mod replay;
pub mod wallet;

pub use error::{ErrorResponse, WalletError};
pub use operation::{Operation, OperationId, OperationKind, Page};
pub use replay::{ReplayAction, ReplayRecord, WalletSummary};
pub use wallet::{timestamp_now, OwnerId, Wallet, WalletId};
