//! Replay file records and results
//!
//! A replay file is a CSV script of wallet openings and operations, keyed by
//! free-form labels instead of wallet ids.

use super::operation::OperationKind;
use serde::Serialize;

/// What a replay row asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayAction {
    /// Create a wallet for the row's label
    Open,

    /// Apply a deposit or withdrawal to the labelled wallet
    Apply(OperationKind),
}

/// A validated replay row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRecord {
    /// Requested action
    pub action: ReplayAction,

    /// Wallet label, or a wallet id for wallets opened elsewhere
    pub wallet: String,

    /// Operation amount; `None` for `Open`
    pub amount: Option<i64>,
}

/// Final state of a wallet opened during a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    /// Label the wallet was opened under
    pub wallet: String,

    /// Committed balance after the replay
    pub balance: i64,

    /// Number of journal entries
    pub operations: usize,
}
