//! Operation-related types for the wallet ledger
//!
//! This module defines operation kinds, journal entries, and the pagination
//! window used to read the journal back.

use super::error::WalletError;
use super::wallet::WalletId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Journal entry identifier
pub type OperationId = Uuid;

/// Balance-changing operations supported by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Credit funds to a wallet
    ///
    /// Increases the balance by the operation amount.
    Deposit,

    /// Debit funds from a wallet
    ///
    /// Decreases the balance by the operation amount. Rejected when the
    /// balance would go negative.
    Withdraw,
}

impl OperationKind {
    /// Canonical spelling, as stored in the journal
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "DEPOSIT",
            OperationKind::Withdraw => "WITHDRAW",
        }
    }

    /// Signed balance delta for an amount of this kind
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            OperationKind::Deposit => amount,
            OperationKind::Withdraw => -amount,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = WalletError;

    /// Case-insensitive; accepts `withdrawal` as an alias of `WITHDRAW`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(OperationKind::Deposit),
            "WITHDRAW" | "WITHDRAWAL" => Ok(OperationKind::Withdraw),
            _ => Err(WalletError::invalid_operation_kind(s)),
        }
    }
}

/// Journal entry for an accepted mutation
///
/// Written exactly once, in the same transaction as the balance update it
/// describes, and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique entry identifier
    pub id: OperationId,

    /// The wallet this operation was applied to
    pub wallet_id: WalletId,

    /// Deposit or withdrawal
    pub kind: OperationKind,

    /// Requested magnitude, always strictly positive
    pub amount: i64,

    /// The wallet balance immediately after this operation was applied
    pub balance_after: i64,

    /// When the operation was applied
    pub created_at: DateTime<Utc>,
}

impl Operation {
    /// Create a journal entry for an operation that has just been applied
    pub fn new(
        wallet_id: WalletId,
        kind: OperationKind,
        amount: i64,
        balance_after: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Operation {
            id: Uuid::new_v4(),
            wallet_id,
            kind,
            amount,
            balance_after,
            created_at,
        }
    }

    /// Signed balance delta this entry contributed
    pub fn delta(&self) -> i64 {
        self.kind.signed(self.amount)
    }
}

/// Pagination window over a wallet's journal
///
/// Every way of building one, deserialization included, clamps `limit`
/// into `1..=MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PageParams")]
pub struct Page {
    limit: u32,
    offset: u32,
}

/// Unchecked page parameters as they arrive from callers
#[derive(Debug, Clone, Copy, Deserialize)]
struct PageParams {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    Page::DEFAULT_LIMIT
}

impl From<PageParams> for Page {
    fn from(params: PageParams) -> Self {
        Page::new(params.limit, params.offset)
    }
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    /// Create a page, clamping `limit` into `1..=MAX_LIMIT`
    pub fn new(limit: u32, offset: u32) -> Self {
        Page {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }

    /// Maximum number of entries to return
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of newest entries to skip
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(Self::DEFAULT_LIMIT, 0)
    }
}
