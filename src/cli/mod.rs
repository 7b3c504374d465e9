//! Command-line interface
//!
//! Argument parsing and command dispatch. Every command writes its result to
//! the given output as JSON, except `replay`, which writes the CSV summary.

mod args;

pub use args::{CliArgs, Command, ReplayArgs, StrategyType};

use crate::core::service::{OperationRequest, WalletService};
use crate::store::open_store;
use crate::strategy;
use crate::types::{OperationKind, Page, WalletError};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

/// Parse command-line arguments using clap
///
/// On invalid arguments or `--help`, clap prints a message and exits the
/// process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Run one command against the configured store
///
/// # Returns
///
/// * `Ok(())` - The command succeeded and its result was written to `output`
/// * `Err(WalletError)` - The command failed; nothing was written
pub fn run(args: CliArgs, output: &mut dyn Write) -> Result<(), WalletError> {
    let store = open_store(&args.to_store_config())?;
    let service = WalletService::new(Arc::clone(&store));

    match args.command {
        Command::CreateWallet { owner } => print_json(output, &service.create_wallet(&owner)?),
        Command::Get { wallet } => print_json(output, &service.get_wallet(&wallet)?),
        Command::Deposit { wallet, amount } => {
            let request = operation_request(wallet, OperationKind::Deposit, amount);
            print_json(output, &service.process_operation(&request)?)
        }
        Command::Withdraw { wallet, amount } => {
            let request = operation_request(wallet, OperationKind::Withdraw, amount);
            print_json(output, &service.process_operation(&request)?)
        }
        Command::Wallets { owner } => print_json(output, &service.list_user_wallets(&owner)?),
        Command::History {
            wallet,
            limit,
            offset,
        } => print_json(
            output,
            &service.operation_history(&wallet, Page::new(limit, offset))?,
        ),
        Command::Replay(replay) => {
            let config = match replay.strategy {
                StrategyType::Async => Some(replay.to_batch_config()),
                StrategyType::Sync => None,
            };
            let strategy = strategy::create_strategy(replay.strategy, store, config);
            strategy.replay(&replay.input_file, output)
        }
    }
}

fn operation_request(wallet: String, kind: OperationKind, amount: i64) -> OperationRequest {
    OperationRequest {
        wallet_id: wallet,
        operation_type: kind.as_str().to_string(),
        amount,
    }
}

fn print_json<T: Serialize>(output: &mut dyn Write, value: &T) -> Result<(), WalletError> {
    serde_json::to_writer_pretty(&mut *output, value).map_err(|e| WalletError::IoError {
        message: format!("Failed to write JSON output: {}", e),
    })?;
    writeln!(output)?;
    Ok(())
}
