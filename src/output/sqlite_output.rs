//! SQLite output handler
//!
//! Each export creates a `runs` row; records are normalized into one table
//! per multi-valued field, keyed by product and position.

use crate::output::traits::{OutputError, OutputHandler, OutputResult, RunInfo};
use crate::record::ProductRecord;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQL schema for the export database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    base_url TEXT NOT NULL,
    record_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    link TEXT NOT NULL,
    price TEXT,
    fetch_error TEXT
);

CREATE INDEX IF NOT EXISTS idx_products_run ON products(run_id);
CREATE INDEX IF NOT EXISTS idx_products_link ON products(link);

CREATE TABLE IF NOT EXISTS content_fragments (
    product_id INTEGER NOT NULL REFERENCES products(id),
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (product_id, position)
);

CREATE TABLE IF NOT EXISTS table_cells (
    product_id INTEGER NOT NULL REFERENCES products(id),
    row_index INTEGER NOT NULL,
    column_index INTEGER NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (product_id, row_index, column_index)
);

CREATE TABLE IF NOT EXISTS short_description_items (
    product_id INTEGER NOT NULL REFERENCES products(id),
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (product_id, position)
);

CREATE TABLE IF NOT EXISTS images (
    product_id INTEGER NOT NULL REFERENCES products(id),
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    PRIMARY KEY (product_id, position)
);
"#;

/// SQLite-based output handler
pub struct SqliteOutputHandler {
    conn: Connection,
    run_id: i64,
    record_count: u64,
    finished: bool,
}

impl SqliteOutputHandler {
    /// Opens (or creates) the database at `path` and starts a run
    pub fn open(path: &Path, run: &RunInfo) -> OutputResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        Self::with_connection(conn, run)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(run: &RunInfo) -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, run)
    }

    fn with_connection(conn: Connection, run: &RunInfo) -> OutputResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;

        let started_at = if run.started_at.is_empty() {
            Utc::now().to_rfc3339()
        } else {
            run.started_at.clone()
        };
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, base_url) VALUES (?1, ?2, ?3)",
            params![started_at, run.config_hash, run.base_url],
        )?;
        let run_id = conn.last_insert_rowid();

        Ok(Self {
            conn,
            run_id,
            record_count: 0,
            finished: false,
        })
    }

    /// The id of the run rows are written under
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// The underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn insert_record(tx: &rusqlite::Transaction<'_>, run_id: i64, record: &ProductRecord) -> OutputResult<()> {
        tx.execute(
            "INSERT INTO products (run_id, link, price, fetch_error) VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id,
                record.link,
                record.price,
                record.fetch_error.as_ref().map(ToString::to_string)
            ],
        )?;
        let product_id = tx.last_insert_rowid();

        for (position, text) in record.content_fragments.iter().enumerate() {
            tx.execute(
                "INSERT INTO content_fragments (product_id, position, text) VALUES (?1, ?2, ?3)",
                params![product_id, position as i64, text],
            )?;
        }

        for (row_index, row) in record.table_rows.iter().enumerate() {
            for (column_index, text) in row.iter().enumerate() {
                tx.execute(
                    "INSERT INTO table_cells (product_id, row_index, column_index, text)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![product_id, row_index as i64, column_index as i64, text],
                )?;
            }
        }

        for (position, text) in record.short_description_items.iter().enumerate() {
            tx.execute(
                "INSERT INTO short_description_items (product_id, position, text) VALUES (?1, ?2, ?3)",
                params![product_id, position as i64, text],
            )?;
        }

        for (position, url) in record.images.iter().enumerate() {
            tx.execute(
                "INSERT INTO images (product_id, position, url) VALUES (?1, ?2, ?3)",
                params![product_id, position as i64, url],
            )?;
        }

        Ok(())
    }
}

impl OutputHandler for SqliteOutputHandler {
    fn write_records(&mut self, records: &[ProductRecord]) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Finished);
        }

        let tx = self.conn.transaction()?;
        for record in records {
            Self::insert_record(&tx, self.run_id, record)?;
        }
        tx.commit()?;

        self.record_count += records.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }

        self.conn.execute(
            "UPDATE runs SET finished_at = ?1, record_count = ?2 WHERE id = ?3",
            params![Utc::now().to_rfc3339(), self.record_count as i64, self.run_id],
        )?;
        self.finished = true;
        Ok(())
    }
}
