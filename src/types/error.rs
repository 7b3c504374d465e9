//! Error types for the wallet ledger
//!
//! This module defines all error types that can occur while creating wallets,
//! processing operations, and replaying operation files.
//!
//! # Error Categories
//!
//! - **Caller Errors**: Invalid amount, kind, or identifier. No side effects.
//! - **Deterministic Rejections**: Wallet not found, insufficient funds, overflow.
//!   No side effects; retrying without a state change cannot succeed.
//! - **Transient Errors**: Lock wait timeout, persistence failure. The unit of
//!   work was rolled back in full; the caller may retry the whole operation.
//! - **Input Errors**: File I/O and CSV parsing problems during replay.

use super::wallet::WalletId;
use serde::Serialize;
use thiserror::Error;

/// Main error type for the wallet ledger
///
/// Every variant carries enough context to diagnose the failure. No variant
/// is ever returned with the balance and journal out of step with each other.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    /// Amount is zero or negative
    #[error("Invalid amount {amount}: must be greater than zero")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Operation kind is not DEPOSIT or WITHDRAW
    #[error("Invalid operation type '{kind}': must be DEPOSIT or WITHDRAW")]
    InvalidOperationKind {
        /// The rejected kind string
        kind: String,
    },

    /// Wallet identifier is not well-formed
    #[error("Invalid wallet id '{value}'")]
    InvalidWalletId {
        /// The rejected identifier
        value: String,
    },

    /// Owner identifier is not well-formed
    #[error("Invalid owner id '{value}'")]
    InvalidOwnerId {
        /// The rejected identifier
        value: String,
    },

    /// No wallet exists with the given id
    #[error("Wallet {wallet} not found")]
    WalletNotFound {
        /// The wallet that was looked up
        wallet: WalletId,
    },

    /// A wallet with the same identity already exists
    #[error("Wallet {key} already exists")]
    DuplicateWallet {
        /// Wallet id or replay label
        key: String,
    },

    /// Withdrawal would drive the balance negative
    #[error("Insufficient funds in wallet {wallet}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Wallet id
        wallet: WalletId,
        /// Balance observed under the row lock
        balance: i64,
        /// Requested withdrawal amount
        requested: i64,
    },

    /// Deposit would overflow the balance column
    #[error("Balance overflow in wallet {wallet}: balance {balance}, requested {requested}")]
    BalanceOverflow {
        /// Wallet id
        wallet: WalletId,
        /// Balance observed under the row lock
        balance: i64,
        /// Requested deposit amount
        requested: i64,
    },

    /// Waiting for the wallet row lock exceeded the configured bound
    #[error("Timed out after {waited_ms}ms waiting for lock on wallet {wallet}")]
    Timeout {
        /// Wallet id
        wallet: WalletId,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// The unit of work could not be committed and was rolled back
    #[error("Persistence failure: {message}")]
    PersistenceFailure {
        /// Description of the storage failure
        message: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        WalletError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for WalletError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        WalletError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl WalletError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: i64) -> Self {
        WalletError::InvalidAmount { amount }
    }

    /// Create an InvalidOperationKind error
    pub fn invalid_operation_kind(kind: &str) -> Self {
        WalletError::InvalidOperationKind {
            kind: kind.to_string(),
        }
    }

    /// Create an InvalidWalletId error
    pub fn invalid_wallet_id(value: &str) -> Self {
        WalletError::InvalidWalletId {
            value: value.to_string(),
        }
    }

    /// Create an InvalidOwnerId error
    pub fn invalid_owner_id(value: &str) -> Self {
        WalletError::InvalidOwnerId {
            value: value.to_string(),
        }
    }

    /// Create a WalletNotFound error
    pub fn wallet_not_found(wallet: WalletId) -> Self {
        WalletError::WalletNotFound { wallet }
    }

    /// Create a DuplicateWallet error
    pub fn duplicate_wallet(key: impl ToString) -> Self {
        WalletError::DuplicateWallet {
            key: key.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(wallet: WalletId, balance: i64, requested: i64) -> Self {
        WalletError::InsufficientFunds {
            wallet,
            balance,
            requested,
        }
    }

    /// Create a BalanceOverflow error
    pub fn balance_overflow(wallet: WalletId, balance: i64, requested: i64) -> Self {
        WalletError::BalanceOverflow {
            wallet,
            balance,
            requested,
        }
    }

    /// Create a Timeout error
    pub fn timeout(wallet: WalletId, waited: std::time::Duration) -> Self {
        WalletError::Timeout {
            wallet,
            waited_ms: waited.as_millis() as u64,
        }
    }

    /// Create a PersistenceFailure error
    pub fn persistence(message: impl ToString) -> Self {
        WalletError::PersistenceFailure {
            message: message.to_string(),
        }
    }

    /// Whether retrying the whole operation may succeed without a state change
    ///
    /// Only transient storage conditions qualify. Every other variant is
    /// deterministic given the same inputs and state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::PersistenceFailure { .. } | WalletError::Timeout { .. }
        )
    }

    /// Stable machine-readable code for the external interface
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InvalidAmount { .. } => "INVALID_AMOUNT",
            WalletError::InvalidOperationKind { .. } => "INVALID_OPERATION_TYPE",
            WalletError::InvalidWalletId { .. } => "INVALID_WALLET_ID",
            WalletError::InvalidOwnerId { .. } => "INVALID_OWNER_ID",
            WalletError::WalletNotFound { .. } => "WALLET_NOT_FOUND",
            WalletError::DuplicateWallet { .. } => "DUPLICATE_WALLET",
            WalletError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            WalletError::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            WalletError::Timeout { .. } => "TIMEOUT",
            WalletError::PersistenceFailure { .. } => "PERSISTENCE_FAILURE",
            WalletError::IoError { .. } => "IO_ERROR",
            WalletError::ParseError { .. } => "PARSE_ERROR",
        }
    }

    /// HTTP status an HTTP front end should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            WalletError::WalletNotFound { .. } => 404,
            WalletError::DuplicateWallet { .. } => 409,
            WalletError::Timeout { .. } => 503,
            WalletError::PersistenceFailure { .. } | WalletError::IoError { .. } => 500,
            WalletError::InvalidAmount { .. }
            | WalletError::InvalidOperationKind { .. }
            | WalletError::InvalidWalletId { .. }
            | WalletError::InvalidOwnerId { .. }
            | WalletError::InsufficientFunds { .. }
            | WalletError::BalanceOverflow { .. }
            | WalletError::ParseError { .. } => 400,
        }
    }
}

/// Error body handed to the external interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub code: &'static str,
    pub error: String,
    pub retryable: bool,
}

impl From<&WalletError> for ErrorResponse {
    fn from(error: &WalletError) -> Self {
        ErrorResponse {
            status: error.http_status(),
            code: error.code(),
            error: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}
