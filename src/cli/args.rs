use crate::logging::LogFormat;
use crate::store::StoreConfig;
use crate::strategy::BatchConfig;
use crate::types::Page;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Wallet ledger with atomic deposits and withdrawals
#[derive(Parser, Debug)]
#[command(name = "wallet-ledger")]
#[command(about = "Wallet ledger with atomic deposits and withdrawals", long_about = None)]
pub struct CliArgs {
    /// SQLite database file; omit to use a throwaway in-memory store
    #[arg(long, value_name = "PATH", env = "WALLET_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// How long an operation waits for a wallet row lock
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MS",
        env = "WALLET_LOCK_TIMEOUT_MS",
        default_value_t = 5000,
        global = true
    )]
    pub lock_timeout_ms: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        env = "WALLET_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    pub log_level: String,

    /// Log output format
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        env = "WALLET_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Ledger commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty wallet for an owner
    CreateWallet {
        /// Owner id (UUID)
        #[arg(long)]
        owner: String,
    },

    /// Show a wallet
    Get {
        /// Wallet id
        wallet: String,
    },

    /// Credit a wallet
    Deposit {
        /// Wallet id
        wallet: String,
        /// Amount in minor units
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },

    /// Debit a wallet
    Withdraw {
        /// Wallet id
        wallet: String,
        /// Amount in minor units
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },

    /// List an owner's wallets, newest first
    Wallets {
        /// Owner id (UUID)
        #[arg(long)]
        owner: String,
    },

    /// Show a wallet's operations, newest first
    History {
        /// Wallet id
        wallet: String,
        /// Maximum entries to return (1-1000)
        #[arg(long, default_value_t = Page::DEFAULT_LIMIT)]
        limit: u32,
        /// Newest entries to skip
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Replay a CSV file of wallet openings and operations
    Replay(ReplayArgs),
}

/// Options of the `replay` command
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Input CSV file with columns type,wallet,amount
    #[arg(value_name = "INPUT")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for synchronous or 'async' for asynchronous"
    )]
    pub strategy: StrategyType,

    /// Number of rows per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of rows per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of labels processed concurrently (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads and labels processed concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Storage configuration from the global options
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            database: self.database.clone(),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }
}

impl ReplayArgs {
    /// Create a BatchConfig from the replay options
    ///
    /// Missing values use the defaults; zero values fall back to the defaults
    /// with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn replay_args(args: &[&str]) -> ReplayArgs {
        match CliArgs::try_parse_from(args).unwrap().command {
            Command::Replay(replay) => replay,
            other => panic!("expected replay, got {:?}", other),
        }
    }

    #[rstest]
    #[case::default_strategy(&["program", "replay", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "replay", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "replay", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        assert_eq!(replay_args(args).strategy, expected);
    }

    #[rstest]
    #[case::all_defaults(&["program", "replay", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "replay", "--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "replay", "--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "replay", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "replay", "--max-concurrent", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = replay_args(args).to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[test]
    fn test_global_options() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "get",
            "some-wallet",
            "--database",
            "ledger.db",
            "--lock-timeout-ms",
            "250",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(
            parsed.to_store_config(),
            StoreConfig {
                database: Some(PathBuf::from("ledger.db")),
                lock_timeout: Duration::from_millis(250),
            }
        );
        assert_eq!(parsed.log_format, LogFormat::Json);
        assert!(matches!(parsed.command, Command::Get { ref wallet } if wallet == "some-wallet"));
    }

    #[test]
    fn test_negative_amount_reaches_validation() {
        let parsed = CliArgs::try_parse_from(["program", "deposit", "w", "-5"]).unwrap();
        assert!(matches!(parsed.command, Command::Deposit { amount: -5, .. }));
    }

    #[test]
    fn test_history_defaults() {
        let parsed = CliArgs::try_parse_from(["program", "history", "w"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::History { limit: 50, offset: 0, .. }
        ));
    }

    #[rstest]
    #[case::missing_command(&["program"])]
    #[case::missing_replay_input(&["program", "replay"])]
    #[case::invalid_strategy(&["program", "replay", "--strategy", "invalid", "input.csv"])]
    #[case::create_without_owner(&["program", "create-wallet"])]
    #[case::non_numeric_amount(&["program", "withdraw", "w", "ten"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
