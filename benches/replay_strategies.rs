//! Benchmark suite for replay strategies and the operation processor
//!
//! Compares the synchronous and asynchronous replay strategies over generated
//! CSV files, and measures single deposits against both storage engines.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! Replay inputs are generated into a temporary directory: `wallets` labels
//! are opened, then operations cycle through them, roughly one withdrawal
//! for every three deposits.

use divan::Bencher;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use wallet_ledger::cli::StrategyType;
use wallet_ledger::core::OperationProcessor;
use wallet_ledger::store::{open_store, StoreConfig};
use wallet_ledger::strategy::{create_strategy, BatchConfig};
use wallet_ledger::types::{OperationKind, OwnerId, Wallet};

fn main() {
    divan::main();
}

const ROW_COUNTS: &[usize] = &[100, 1_000, 10_000];

fn fixture_dir() -> &'static TempDir {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| TempDir::new().expect("Failed to create fixture dir"))
}

/// Write (once) a replay file with `rows` operations and return its path
fn replay_fixture(rows: usize) -> PathBuf {
    let path = fixture_dir().path().join(format!("replay_{}.csv", rows));
    if path.exists() {
        return path;
    }

    let wallets = (rows / 20).max(1);
    let mut csv = String::from("type,wallet,amount\n");
    for w in 0..wallets {
        writeln!(csv, "open,w{},", w).expect("String write failed");
    }
    for i in 0..rows {
        let kind = if i % 4 == 3 { "withdraw" } else { "deposit" };
        writeln!(csv, "{},w{},{}", kind, i % wallets, 1 + i % 97).expect("String write failed");
    }
    fs::write(&path, csv).expect("Failed to write replay fixture");
    path
}

fn replay(bencher: Bencher, strategy_type: StrategyType, rows: usize) {
    let path = replay_fixture(rows);
    bencher
        .with_inputs(|| {
            let store = open_store(&StoreConfig::default()).expect("Failed to open store");
            create_strategy(strategy_type, store, Some(BatchConfig::default()))
        })
        .bench_values(|strategy| {
            let mut output = Vec::new();
            strategy
                .replay(&path, &mut output)
                .expect("Replay failed");
            output
        });
}

/// Synchronous replay into the in-memory store
#[divan::bench(args = ROW_COUNTS)]
fn sync_replay(bencher: Bencher, rows: usize) {
    replay(bencher, StrategyType::Sync, rows);
}

/// Asynchronous batch replay into the in-memory store
#[divan::bench(args = ROW_COUNTS)]
fn async_replay(bencher: Bencher, rows: usize) {
    replay(bencher, StrategyType::Async, rows);
}

fn deposit(bencher: Bencher, config: StoreConfig) {
    let store = open_store(&config).expect("Failed to open store");
    let wallet = Wallet::new(OwnerId::new_v4());
    store.create(&wallet).expect("Failed to create wallet");
    let processor = OperationProcessor::new(Arc::clone(&store));

    bencher.bench(|| {
        processor
            .process(wallet.id, OperationKind::Deposit, 1)
            .expect("Deposit failed")
    });
}

/// One deposit against the in-memory store
#[divan::bench]
fn memory_deposit(bencher: Bencher) {
    deposit(bencher, StoreConfig::default());
}

/// One durable deposit against a SQLite file
#[divan::bench(sample_count = 20)]
fn sqlite_deposit(bencher: Bencher) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    deposit(
        bencher,
        StoreConfig {
            database: Some(dir.path().join("bench.db")),
            ..StoreConfig::default()
        },
    );
}
