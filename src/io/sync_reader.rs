//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over replay records from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to read and deserialize CSV records
//! sequentially, one row at a time, without loading the file into memory.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as `ParseError` items carrying the line
//!   number, so callers can log them and keep going

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{ReplayRecord, WalletError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Iterator over replay records with constant memory usage.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Open a replay file for streaming iteration
    ///
    /// The CSV reader trims whitespace from every field and allows a missing
    /// trailing amount column.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if the file opened successfully
    /// * `Err(WalletError::IoError)` if it could not be opened
    pub fn new(path: &Path) -> Result<Self, WalletError> {
        let file = File::open(path).map_err(|e| WalletError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<ReplayRecord, WalletError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;
        let line = self.line_num;

        Some(match next {
            Ok(csv_record) => {
                convert_csv_record(csv_record).map_err(|message| WalletError::ParseError {
                    line: Some(line),
                    message,
                })
            }
            Err(e) => Err(WalletError::ParseError {
                line: Some(line),
                message: e.to_string(),
            }),
        })
    }
}
