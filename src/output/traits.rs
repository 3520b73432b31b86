//! Output handler traits and types
//!
//! This module defines the trait interface for record exporters and the
//! run metadata they may record.

use crate::record::ProductRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output already finished")]
    Finished,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Metadata about the run being exported
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    /// Hash of the configuration file the run used
    pub config_hash: String,

    /// Catalog base URL
    pub base_url: String,

    /// RFC 3339 start time of the run
    pub started_at: String,
}

/// Trait for record exporters
///
/// Handlers receive records in the order they should appear in the output.
pub trait OutputHandler {
    /// Writes a batch of records
    fn write_records(&mut self, records: &[ProductRecord]) -> OutputResult<()>;

    /// Flushes and closes the output
    fn finish(&mut self) -> OutputResult<()>;
}
