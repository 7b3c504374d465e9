//! Storage engines
//!
//! Two interchangeable implementations of the repository contract:
//! - `memory`: concurrent maps with per-row locks, lost on exit
//! - `sqlite`: durable single-file database, with the same in-process row locks
//!
//! `open_store` picks one from a `StoreConfig`.

pub mod memory;
mod row_lock;
pub mod sqlite;

pub use memory::{MemoryStore, DEFAULT_LOCK_TIMEOUT};
pub use sqlite::{SqliteStore, SqliteTransaction};

use crate::core::traits::Repository;
use crate::types::WalletError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Storage selection and tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite database file; `None` keeps everything in memory
    pub database: Option<PathBuf>,
    /// Bound on how long a unit of work waits for a wallet row lock
    pub lock_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Open the storage engine described by `config`
///
/// # Returns
///
/// * `Ok(Arc<dyn Repository>)` - Ready-to-use store shared by every caller
/// * `Err(WalletError::PersistenceFailure)` - If the database cannot be opened
/// * `Err(WalletError::IoError)` - If the database directory cannot be created
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn Repository>, WalletError> {
    match &config.database {
        Some(path) => {
            tracing::info!(path = %path.display(), "using sqlite wallet store");
            Ok(Arc::new(SqliteStore::open(path, config.lock_timeout)?))
        }
        None => {
            tracing::info!("using in-memory wallet store");
            Ok(Arc::new(MemoryStore::with_lock_timeout(config.lock_timeout)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OwnerId, Wallet};
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_in_memory() {
        let config = StoreConfig::default();
        assert_eq!(config.database, None);
        assert_eq!(config.lock_timeout, DEFAULT_LOCK_TIMEOUT);
    }

    #[test]
    fn test_open_store_memory() {
        let store = open_store(&StoreConfig::default()).unwrap();
        let wallet = Wallet::new(OwnerId::new_v4());
        store.create(&wallet).unwrap();
        assert_eq!(store.find_by_id(wallet.id).unwrap(), Some(wallet));
    }

    #[test]
    fn test_open_store_sqlite() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            database: Some(dir.path().join("ledger.db")),
            lock_timeout: Duration::from_millis(500),
        };

        let store = open_store(&config).unwrap();
        let wallet = Wallet::new(OwnerId::new_v4());
        store.create(&wallet).unwrap();
        assert!(store.find_by_id(wallet.id).unwrap().is_some());
        assert!(dir.path().join("ledger.db").exists());
    }
}
