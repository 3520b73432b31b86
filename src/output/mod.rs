//! Output module for exporting harvested records
//!
//! This module handles:
//! - Writing records to a CSV file or a SQLite database
//! - Putting records into a stable order before export
//! - Computing end-of-run statistics

mod csv_output;
mod sqlite_output;
pub mod stats;
mod traits;

pub use csv_output::{to_csv_row, CsvOutputHandler, CSV_HEADERS};
pub use sqlite_output::SqliteOutputHandler;
pub use stats::{print_statistics, HarvestStatistics};
pub use traits::{OutputError, OutputHandler, OutputResult, RunInfo};

use crate::config::{OutputConfig, OutputFormat};
use crate::record::ProductRecord;
use std::path::Path;

/// Opens the exporter selected by the output configuration
///
/// # Arguments
///
/// * `config` - Output path and format
/// * `run` - Run metadata (recorded by exporters that keep it)
///
/// # Returns
///
/// * `Ok(Box<dyn OutputHandler>)` - Exporter ready for records
/// * `Err(OutputError)` - The output file could not be created
pub fn open_output(config: &OutputConfig, run: &RunInfo) -> OutputResult<Box<dyn OutputHandler>> {
    let path = Path::new(&config.path);
    tracing::info!("Writing {} output to {}", config.format, path.display());

    match config.format {
        OutputFormat::Csv => Ok(Box::new(CsvOutputHandler::create(path)?)),
        OutputFormat::Sqlite => Ok(Box::new(SqliteOutputHandler::open(path, run)?)),
    }
}

/// Sorts records by link
///
/// Batch results arrive in completion order, which differs between runs.
pub fn sort_by_link(records: &mut [ProductRecord]) {
    records.sort_by(|a, b| a.link.cmp(&b.link));
}

/// Sorts, writes and finishes in one go
pub fn export_records(
    handler: &mut dyn OutputHandler,
    records: &mut [ProductRecord],
) -> OutputResult<()> {
    sort_by_link(records);
    handler.write_records(records)?;
    handler.finish()
}
