//! Wallet-related types for the wallet ledger
//!
//! This module defines the Wallet record and the identifiers used to address
//! wallets and their owners.

use super::error::WalletError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Wallet identifier
///
/// Opaque and immutable once the wallet is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(pub Uuid);

/// Identifier of the user owning a wallet
///
/// Users live in an external system; the ledger only stores the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub Uuid);

impl WalletId {
    /// Generate a fresh random wallet identifier
    pub fn new_v4() -> Self {
        WalletId(Uuid::new_v4())
    }
}

impl OwnerId {
    /// Generate a fresh random owner identifier
    pub fn new_v4() -> Self {
        OwnerId(Uuid::new_v4())
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for WalletId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(WalletId)
            .map_err(|_| WalletError::invalid_wallet_id(s))
    }
}

impl FromStr for OwnerId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(OwnerId)
            .map_err(|_| WalletError::invalid_owner_id(s))
    }
}

/// Wallet record
///
/// A balance-bearing account belonging to one owner. The balance is kept in
/// the smallest currency unit and is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet identifier
    pub id: WalletId,

    /// The owning user
    pub owner_id: OwnerId,

    /// Current balance in minor units (e.g. cents)
    ///
    /// Only the operation processor writes this field, and only inside its
    /// locked transactional step.
    pub balance: i64,

    /// When the wallet was created
    pub created_at: DateTime<Utc>,

    /// When the balance last changed
    ///
    /// Monotonically non-decreasing across mutations.
    pub updated_at: DateTime<Utc>,
}

/// Current time at the precision every store keeps: whole microseconds
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl Wallet {
    /// Create a new wallet for an owner with a zero balance
    ///
    /// # Arguments
    ///
    /// * `owner_id` - The user that owns the wallet
    ///
    /// # Returns
    ///
    /// A new Wallet with a fresh id, balance = 0, and both timestamps set to now.
    pub fn new(owner_id: OwnerId) -> Self {
        let now = timestamp_now();
        Wallet {
            id: WalletId::new_v4(),
            owner_id,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_timestamps_have_microsecond_precision() {
        let wallet = Wallet::new(OwnerId::new_v4());
        assert_eq!(wallet.created_at.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(timestamp_now().timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_new_wallet_starts_empty() {
        let owner = OwnerId::new_v4();
        let wallet = Wallet::new(owner);

        assert_eq!(wallet.owner_id, owner);
        assert_eq!(wallet.balance, 0);
        assert_eq!(wallet.created_at, wallet.updated_at);
    }

    #[test]
    fn test_new_wallets_get_distinct_ids() {
        let owner = OwnerId::new_v4();
        assert_ne!(Wallet::new(owner).id, Wallet::new(owner).id);
    }

    #[rstest]
    #[case("67e55044-10b1-426f-9247-bb680e5fe0c8")]
    #[case("  67e55044-10b1-426f-9247-bb680e5fe0c8  ")]
    fn test_wallet_id_parses(#[case] input: &str) {
        let id: WalletId = input.parse().unwrap();
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[rstest]
    #[case("")]
    #[case("not-a-uuid")]
    #[case("67e55044-10b1-426f-9247")]
    fn test_wallet_id_rejects_malformed(#[case] input: &str) {
        let result: Result<WalletId, _> = input.parse();
        assert_eq!(result, Err(WalletError::invalid_wallet_id(input)));
    }

    #[test]
    fn test_owner_id_rejects_malformed() {
        let result: Result<OwnerId, _> = "bob".parse();
        assert_eq!(result, Err(WalletError::invalid_owner_id("bob")));
    }

    #[test]
    fn test_wallet_serializes_ids_as_plain_strings() {
        let wallet = Wallet::new(OwnerId::new_v4());
        let json = serde_json::to_value(&wallet).unwrap();

        assert_eq!(json["id"], wallet.id.to_string());
        assert_eq!(json["owner_id"], wallet.owner_id.to_string());
        assert_eq!(json["balance"], 0);
    }
}
