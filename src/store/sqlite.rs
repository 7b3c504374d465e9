//! SQLite-backed wallet store
//!
//! Durable implementation of the repository contract on top of a single
//! SQLite database file in WAL mode.
//!
//! SQLite only locks the whole database for writing, so row locks are kept
//! in process: one `RowLock` per wallet, shared by every clone of the store.
//! A unit of work takes its wallet's row lock, reads the row without a
//! database lock, and stages its writes. Only `commit` opens a short
//! `BEGIN IMMEDIATE` transaction to flush them, so a held wallet never keeps
//! other wallets from being written. Waiting for that write lock is bounded
//! by `busy_timeout` and fails with `Timeout`.
//!
//! The balance update is conditional on the row still holding the value read
//! under the lock. A writer outside this process that changed it turns the
//! commit into a retryable `PersistenceFailure` instead of a lost update.

use crate::core::traits::{OperationJournal, StoreTransaction, WalletStore};
use super::row_lock::{held_row, second_lock_error, LockedRow, RowLock};
use crate::types::{Operation, OperationKind, OwnerId, Page, Wallet, WalletError, WalletId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Durable wallet repository stored in a SQLite file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    lock_timeout: Duration,
    locks: Arc<DashMap<WalletId, Arc<RowLock>>>,
}

impl SqliteStore {
    const SCHEMA: &'static str = "
        CREATE TABLE IF NOT EXISTS wallets (
            id TEXT PRIMARY KEY NOT NULL,
            owner_id TEXT NOT NULL,
            balance INTEGER NOT NULL CHECK (balance >= 0),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_wallets_owner
        ON wallets(owner_id);

        CREATE TABLE IF NOT EXISTS operations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            wallet_id TEXT NOT NULL REFERENCES wallets(id),
            kind TEXT NOT NULL CHECK (kind IN ('DEPOSIT', 'WITHDRAW')),
            amount INTEGER NOT NULL CHECK (amount > 0),
            balance_after INTEGER NOT NULL CHECK (balance_after >= 0),
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_operations_wallet
        ON operations(wallet_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_operations_created
        ON operations(created_at);
    ";

    /// Open or create a wallet database at the given path
    ///
    /// Creates the parent directory if needed, switches the database to WAL
    /// and applies the schema.
    ///
    /// # Arguments
    ///
    /// * `path` - Database file location
    /// * `lock_timeout` - Bound on how long a writer waits for the write lock
    pub fn open(path: impl AsRef<Path>, lock_timeout: Duration) -> Result<Self, WalletError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = SqliteStore {
            path: path.to_path_buf(),
            lock_timeout,
            locks: Arc::new(DashMap::new()),
        };
        let db = store.connect()?;
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .map_err(|e| storage_error("Failed to set wallet database pragmas", e))?;
        db.execute_batch(Self::SCHEMA)
            .map_err(|e| storage_error("Failed to create wallet schema", e))?;

        tracing::debug!(path = %path.display(), "wallet database ready");
        Ok(store)
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, WalletError> {
        let db = Connection::open(&self.path).map_err(|e| {
            storage_error(
                &format!("Failed to open wallet database at {}", self.path.display()),
                e,
            )
        })?;
        db.busy_timeout(self.lock_timeout)
            .map_err(|e| storage_error("Failed to set busy timeout", e))?;
        db.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| storage_error("Failed to enable foreign keys", e))?;
        Ok(db)
    }
}

impl WalletStore for SqliteStore {
    fn create(&self, wallet: &Wallet) -> Result<(), WalletError> {
        let db = self.connect()?;
        db.execute(
            "INSERT INTO wallets (id, owner_id, balance, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                wallet.id.to_string(),
                wallet.owner_id.to_string(),
                wallet.balance,
                wallet.created_at.timestamp_micros(),
                wallet.updated_at.timestamp_micros()
            ],
        )
        .map_err(|e| {
            if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
                WalletError::duplicate_wallet(wallet.id)
            } else {
                storage_error("Failed to insert wallet", e)
            }
        })?;
        Ok(())
    }

    fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, WalletError> {
        let db = self.connect()?;
        select_wallet(&db, id)
    }

    fn find_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Wallet>, WalletError> {
        let db = self.connect()?;
        let mut stmt = db
            .prepare(
                "SELECT id, owner_id, balance, created_at, updated_at
                 FROM wallets WHERE owner_id = ?1
                 ORDER BY created_at DESC, id ASC",
            )
            .map_err(|e| storage_error("Failed to prepare owner query", e))?;
        let rows = stmt
            .query_map(params![owner_id.to_string()], wallet_from_row)
            .map_err(|e| storage_error("Failed to query wallets by owner", e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| storage_error("Failed to read wallet row", e))
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction>, WalletError> {
        Ok(Box::new(SqliteTransaction {
            db: self.connect()?,
            locks: Arc::clone(&self.locks),
            held: None,
            lock_timeout: self.lock_timeout,
        }))
    }
}

impl OperationJournal for SqliteStore {
    fn list(&self, wallet_id: WalletId, page: Page) -> Result<Vec<Operation>, WalletError> {
        let db = self.connect()?;
        let mut stmt = db
            .prepare(
                "SELECT id, wallet_id, kind, amount, balance_after, created_at
                 FROM operations WHERE wallet_id = ?1
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| storage_error("Failed to prepare journal query", e))?;
        let rows = stmt
            .query_map(
                params![wallet_id.to_string(), page.limit(), page.offset()],
                operation_from_row,
            )
            .map_err(|e| storage_error("Failed to query journal", e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| storage_error("Failed to read journal row", e))
    }
}

/// Unit of work on its own SQLite connection
///
/// Holds at most one wallet's row lock. No SQL transaction is open until
/// `commit` flushes the staged writes.
pub struct SqliteTransaction {
    db: Connection,
    locks: Arc<DashMap<WalletId, Arc<RowLock>>>,
    held: Option<LockedRow>,
    lock_timeout: Duration,
}

impl StoreTransaction for SqliteTransaction {
    fn find_by_id_for_update(&mut self, id: WalletId) -> Result<Option<Wallet>, WalletError> {
        if let Some(held) = &self.held {
            if held.wallet.id != id {
                return Err(second_lock_error(held));
            }
            return Ok(Some(held.current()));
        }

        // Wallets are never deleted, so a missing row needs no lock.
        if select_wallet(&self.db, id)?.is_none() {
            return Ok(None);
        }

        let lock = Arc::clone(self.locks.entry(id).or_default().value());
        let guard = lock.acquire_for(id, self.lock_timeout)?;

        // Re-read under the lock: the previous holder may have committed.
        let Some(wallet) = select_wallet(&self.db, id)? else {
            return Ok(None);
        };
        self.held = Some(LockedRow::new(wallet.clone(), guard));
        Ok(Some(wallet))
    }

    fn update_balance(
        &mut self,
        id: WalletId,
        new_balance: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), WalletError> {
        held_row(&mut self.held, id)?.stage_balance(new_balance, updated_at)
    }

    fn append(&mut self, operation: &Operation) -> Result<(), WalletError> {
        held_row(&mut self.held, operation.wallet_id)?.stage_operation(operation);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), WalletError> {
        let SqliteTransaction {
            mut db,
            held,
            lock_timeout,
            ..
        } = *self;
        let Some(held) = held else {
            return Ok(());
        };
        if held.is_clean() {
            return Ok(());
        }
        let id = held.wallet.id;

        let started = Instant::now();
        let tx = db
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                    WalletError::timeout(id, started.elapsed().max(lock_timeout))
                }
                _ => storage_error("Failed to begin wallet transaction", e),
            })?;

        // Any early return drops `tx`, which rolls the flush back.
        if let Some((balance, updated_at)) = held.staged_balance {
            let changed = tx
                .execute(
                    "UPDATE wallets SET balance = ?1, updated_at = ?2
                     WHERE id = ?3 AND balance = ?4 AND updated_at = ?5",
                    params![
                        balance,
                        updated_at.timestamp_micros(),
                        id.to_string(),
                        held.wallet.balance,
                        held.wallet.updated_at.timestamp_micros()
                    ],
                )
                .map_err(|e| storage_error("Failed to update wallet balance", e))?;
            if changed != 1 {
                return Err(WalletError::persistence(format!(
                    "wallet {} was modified outside this transaction",
                    id
                )));
            }
        }
        for operation in &held.staged_operations {
            insert_operation(&tx, operation)?;
        }
        tx.commit()
            .map_err(|e| storage_error("Failed to commit wallet transaction", e))?;

        // The row lock is released only after the flush is durable.
        drop(held);
        Ok(())
    }
}

fn insert_operation(db: &Connection, operation: &Operation) -> Result<(), WalletError> {
    db.execute(
        "INSERT INTO operations (id, wallet_id, kind, amount, balance_after, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            operation.id.to_string(),
            operation.wallet_id.to_string(),
            operation.kind.as_str(),
            operation.amount,
            operation.balance_after,
            operation.created_at.timestamp_micros()
        ],
    )
    .map_err(|e| storage_error("Failed to append journal entry", e))?;
    Ok(())
}

fn storage_error(context: &str, error: rusqlite::Error) -> WalletError {
    WalletError::persistence(format!("{}: {}", context, error))
}

fn select_wallet(db: &Connection, id: WalletId) -> Result<Option<Wallet>, WalletError> {
    db.query_row(
        "SELECT id, owner_id, balance, created_at, updated_at FROM wallets WHERE id = ?1",
        params![id.to_string()],
        wallet_from_row,
    )
    .optional()
    .map_err(|e| storage_error("Failed to load wallet", e))
}

fn wallet_from_row(row: &Row<'_>) -> rusqlite::Result<Wallet> {
    Ok(Wallet {
        id: WalletId(uuid_column(row, 0)?),
        owner_id: OwnerId(uuid_column(row, 1)?),
        balance: row.get(2)?,
        created_at: time_column(row, 3)?,
        updated_at: time_column(row, 4)?,
    })
}

fn operation_from_row(row: &Row<'_>) -> rusqlite::Result<Operation> {
    let kind: String = row.get(2)?;
    let kind: OperationKind = kind
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Operation {
        id: uuid_column(row, 0)?,
        wallet_id: WalletId(uuid_column(row, 1)?),
        kind,
        amount: row.get(3)?,
        balance_after: row.get(4)?,
        created_at: time_column(row, 5)?,
    })
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, "timestamp out of range".into())
    })
}
