//! Records produced by a harvest run
//!
//! A [`ProductRecord`] is created once per product URL and never mutated
//! after the extractor returns it.

use crate::FetchError;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// De-duplicated product URLs found during link discovery
pub type LinkSet = BTreeSet<String>;

/// Everything extracted from one product page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRecord {
    /// The product page URL
    pub link: String,

    /// Text of every field-selector match, selectors in configured order
    pub content_fragments: Vec<String>,

    /// Specification table rows, each a list of cell texts
    pub table_rows: Vec<Vec<String>>,

    /// Struck-through price, when the price element carries one
    pub price: Option<String>,

    /// Bullet items of the short description
    pub short_description_items: Vec<String>,

    /// Absolute image URLs in document order (duplicates kept)
    pub images: Vec<String>,

    /// Set when the product page itself could not be fetched
    pub fetch_error: Option<FetchError>,
}

impl ProductRecord {
    /// Creates an empty record for the given link
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Default::default()
        }
    }

    /// Creates a record for a product page that could not be fetched
    ///
    /// All extracted fields stay at their empty defaults.
    pub fn failed(link: impl Into<String>, error: FetchError) -> Self {
        Self {
            link: link.into(),
            fetch_error: Some(error),
            ..Default::default()
        }
    }

    /// Returns true if the product page was fetched
    pub fn is_fetched(&self) -> bool {
        self.fetch_error.is_none()
    }

    /// The first content fragment, conventionally the product title
    pub fn title(&self) -> Option<&str> {
        self.content_fragments.first().map(String::as_str)
    }
}

/// An image written to the image directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Absolute source URL
    pub url: String,

    /// File name derived from the URL's last path segment
    pub file_name: String,

    /// Full path of the written file
    pub path: PathBuf,

    /// Source URL of a different image previously stored under the same name
    pub overwrote: Option<String>,
}
