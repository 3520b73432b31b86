//! Statistics over a finished harvest
//!
//! Computed from the records themselves, so they work with any exporter.

use crate::record::ProductRecord;
use std::collections::BTreeMap;

/// Harvest statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestStatistics {
    /// Number of records (one per discovered link that was dispatched)
    pub total_records: usize,

    /// Records whose product page was fetched
    pub fetched: usize,

    /// Records carrying a fetch error
    pub failed: usize,

    /// Records with a captured (struck-through) price
    pub with_price: usize,

    /// Records with at least one specification table row
    pub with_table: usize,

    /// Image URLs recorded across all records
    pub image_urls: usize,

    /// Failure reasons grouped by error kind
    pub failures_by_kind: BTreeMap<&'static str, usize>,
}

impl HarvestStatistics {
    /// Computes statistics for a set of records
    pub fn from_records(records: &[ProductRecord]) -> Self {
        let mut stats = Self {
            total_records: records.len(),
            ..Default::default()
        };

        for record in records {
            match &record.fetch_error {
                None => stats.fetched += 1,
                Some(error) => {
                    stats.failed += 1;
                    *stats.failures_by_kind.entry(error_kind(error)).or_insert(0) += 1;
                }
            }
            if record.price.is_some() {
                stats.with_price += 1;
            }
            if !record.table_rows.is_empty() {
                stats.with_table += 1;
            }
            stats.image_urls += record.images.len();
        }

        stats
    }

    /// Percentage of records whose page was fetched
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.fetched as f64 / self.total_records as f64 * 100.0
        }
    }
}

fn error_kind(error: &crate::FetchError) -> &'static str {
    use crate::FetchError;
    match error {
        FetchError::Timeout { .. } => "timeout",
        FetchError::Transport { .. } => "transport",
        FetchError::Status { .. } => "http status",
        FetchError::Decode { .. } => "decode",
        FetchError::Storage { .. } => "storage",
        FetchError::InvalidName { .. } => "invalid name",
        FetchError::Aborted { .. } => "aborted",
    }
}

/// Prints statistics to stdout in a human-readable format
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Records: {}", stats.total_records);
    println!("  Fetched: {}", stats.fetched);
    println!("  Failed: {}", stats.failed);
    println!("  Success rate: {:.2}%", stats.success_rate());
    println!();

    println!("Fields:");
    println!("  With price: {}", stats.with_price);
    println!("  With table: {}", stats.with_table);
    println!("  Image URLs: {}", stats.image_urls);

    if !stats.failures_by_kind.is_empty() {
        println!("\nFailures:");
        for (kind, count) in &stats.failures_by_kind {
            println!("  {}: {}", kind, count);
        }
    }
}
