//! CSV format handling for replay records and wallet output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to replay records
//! - Wallet summary serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{OperationKind, ReplayAction, ReplayRecord, WalletError, WalletSummary};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, wallet, amount.
/// The amount field is optional because `open` rows don't carry one.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub action: String,
    pub wallet: String,
    #[serde(default)]
    pub amount: Option<String>,
}

/// Convert a CsvRecord to a ReplayRecord
///
/// This function:
/// - Parses the type column (`open`, `deposit`, `withdraw`, case-insensitive)
/// - Parses the amount as an integer number of minor units
/// - Requires an amount for deposits and withdrawals
/// - Ignores any amount given on an `open` row
///
/// Amount sign is not checked here; the processor rejects non-positive
/// amounts like any other caller's.
///
/// # Returns
///
/// Result containing either:
/// - Ok(ReplayRecord) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<ReplayRecord, String> {
    let wallet = csv_record.wallet.trim().to_string();
    if wallet.is_empty() {
        return Err("Missing wallet label".to_string());
    }

    let action = if csv_record.action.trim().eq_ignore_ascii_case("open") {
        ReplayAction::Open
    } else {
        let kind: OperationKind = csv_record
            .action
            .parse()
            .map_err(|_| format!("Invalid row type '{}' for wallet {}", csv_record.action, wallet))?;
        ReplayAction::Apply(kind)
    };

    let amount = match csv_record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => match amount_str.trim().parse::<i64>() {
            Ok(amount) => Some(amount),
            Err(_) => {
                return Err(format!(
                    "Invalid amount '{}' for wallet {}",
                    amount_str, wallet
                ))
            }
        },
        _ => None,
    };

    match action {
        ReplayAction::Open => Ok(ReplayRecord {
            action,
            wallet,
            amount: None,
        }),
        ReplayAction::Apply(kind) => {
            if amount.is_none() {
                return Err(format!("{} for wallet {} requires an amount", kind, wallet));
            }
            Ok(ReplayRecord {
                action,
                wallet,
                amount,
            })
        }
    }
}

/// Write wallet summaries to CSV format
///
/// Writes rows with columns: wallet, balance, operations.
/// Rows are sorted by label for deterministic output.
///
/// # Arguments
///
/// * `wallets` - Slice of wallet summaries to write
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_wallets_csv(
    wallets: &[WalletSummary],
    output: &mut dyn Write,
) -> Result<(), WalletError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["wallet", "balance", "operations"])?;

    let mut sorted = wallets.to_vec();
    sorted.sort_by(|a, b| a.wallet.cmp(&b.wallet));

    for summary in sorted {
        writer.write_record(&[
            summary.wallet,
            summary.balance.to_string(),
            summary.operations.to_string(),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
