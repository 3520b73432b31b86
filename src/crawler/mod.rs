//! Crawler module for the extraction pipeline
//!
//! This module contains the core harvesting logic, including:
//! - Class-token HTML parsing
//! - HTTP fetching and error classification
//! - Sequential link discovery over listing pages
//! - Per-product field extraction and image storage
//! - Bounded, cancellable batch orchestration

mod coordinator;
mod discovery;
mod extractor;
mod fetcher;
mod images;
mod orchestrator;
pub mod parser;

pub use coordinator::{run_harvest, Coordinator};
pub use discovery::{collect_product_links, discover_links, listing_page_url};
pub use extractor::{extract_fields, ProductExtractor};
pub use fetcher::{build_http_client, fetch_bytes, fetch_page};
pub use images::{file_name_for, ImageStore};
pub use orchestrator::{run_batch, run_batch_with};
