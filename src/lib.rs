//! Catalog Harvester: structured product extraction from paginated catalogs
//!
//! This crate discovers product pages across a fixed run of listing pages,
//! fetches them concurrently, extracts selector-driven fields and images, and
//! hands the resulting records to an exporter.

pub mod config;
pub mod crawler;
pub mod events;
pub mod output;
pub mod record;

use thiserror::Error;

/// Main error type for harvest operations
///
/// Only failures that abort a whole run end up here. Per-page, per-product
/// and per-image failures are reported as [`FetchError`] values instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failure of a single unit of work (listing page, product page or image)
///
/// Carries owned strings only, so a record can keep the error it failed with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("invalid image payload from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("failed to store image {path}: {message}")]
    Storage { path: String, message: String },

    #[error("cannot derive a file name from {url}")]
    InvalidName { url: String },

    #[error("extraction of {url} aborted: {message}")]
    Aborted { url: String, message: String },
}

impl FetchError {
    /// Classifies a reqwest error for the given URL
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::{Config, ExtractionConfig};
pub use crawler::{run_harvest, Coordinator};
pub use events::{EventSink, HarvestEvent};
pub use record::{LinkSet, ProductRecord, StoredImage};
