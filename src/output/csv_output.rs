//! CSV output handler
//!
//! One row per record. Multi-valued fields are flattened into a single cell
//! joined with ` | `; table rows are flattened cell by cell.

use crate::output::traits::{OutputError, OutputHandler, OutputResult};
use crate::record::ProductRecord;
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column headers, in output order
pub const CSV_HEADERS: [&str; 7] = [
    "Link",
    "Content",
    "Price",
    "Short Description",
    "Table Data",
    "Images",
    "Fetch Error",
];

const SEPARATOR: &str = " | ";

/// Writes records to a CSV file (or any writer)
pub struct CsvOutputHandler<W: Write> {
    writer: Option<Writer<W>>,
}

impl CsvOutputHandler<File> {
    /// Creates the file at `path` and writes the header row
    pub fn create(path: &Path) -> OutputResult<Self> {
        Self::from_writer(File::create(path)?)
    }
}

impl<W: Write> CsvOutputHandler<W> {
    /// Wraps a writer and writes the header row
    pub fn from_writer(inner: W) -> OutputResult<Self> {
        let mut writer = Writer::from_writer(inner);
        writer.write_record(CSV_HEADERS)?;
        Ok(Self {
            writer: Some(writer),
        })
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(mut self) -> OutputResult<W> {
        let writer = self.writer.take().ok_or(OutputError::Finished)?;
        writer
            .into_inner()
            .map_err(|e| OutputError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

impl<W: Write> OutputHandler for CsvOutputHandler<W> {
    fn write_records(&mut self, records: &[ProductRecord]) -> OutputResult<()> {
        let writer = self.writer.as_mut().ok_or(OutputError::Finished)?;
        for record in records {
            writer.write_record(to_csv_row(record))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Flattens a record into CSV cells
pub fn to_csv_row(record: &ProductRecord) -> [String; 7] {
    let table = record
        .table_rows
        .iter()
        .map(|row| row.join(SEPARATOR))
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    [
        record.link.clone(),
        record.content_fragments.join(SEPARATOR),
        record.price.clone().unwrap_or_default(),
        record.short_description_items.join(SEPARATOR),
        table,
        record.images.join(SEPARATOR),
        record
            .fetch_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
    ]
}
