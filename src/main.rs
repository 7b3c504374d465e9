//! Wallet ledger CLI
//!
//! # Usage
//!
//! ```bash
//! wallet-ledger --database ledger.db create-wallet --owner 5f0c...
//! wallet-ledger --database ledger.db deposit <WALLET> 500
//! wallet-ledger --database ledger.db withdraw <WALLET> 200
//! wallet-ledger --database ledger.db history <WALLET> --limit 20
//! wallet-ledger replay --strategy async operations.csv > wallets.csv
//! ```
//!
//! Results go to stdout as JSON (CSV for `replay`). Logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: The command failed; an error object is printed to stderr

use std::process;

use wallet_ledger::cli;
use wallet_ledger::logging;
use wallet_ledger::types::ErrorResponse;

fn main() {
    let args = cli::parse_args();
    logging::init_logging(&args.log_level, args.log_format);

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(args, &mut output) {
        let response = ErrorResponse::from(&e);
        match serde_json::to_string(&response) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("Error: {}", e),
        }
        process::exit(1);
    }
}
