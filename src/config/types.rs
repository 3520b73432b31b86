use serde::Deserialize;
use std::fmt;

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to extract and where to find it
///
/// Every selector is a class token (or a whitespace-separated class string).
/// An empty selector means the field is skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionConfig {
    /// Catalog URL that listing pages are appended to (`{base}/page/{i}/`)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of listing pages to walk, starting at 1
    #[serde(rename = "page-count")]
    pub page_count: u32,

    /// Class of the anchors on listing pages that point at product pages
    #[serde(rename = "link-selector", default)]
    pub link_selector: String,

    /// Classes whose text becomes the record content, in this order
    #[serde(rename = "field-selectors", default)]
    pub field_selectors: Vec<String>,

    /// Class of the specification table
    #[serde(rename = "table-selector", default)]
    pub table_selector: String,

    /// Class of the element holding the (struck-through) price
    #[serde(rename = "price-selector", default)]
    pub price_selector: String,

    /// Class of the bulleted short description
    #[serde(rename = "short-description-selector", default)]
    pub short_description_selector: String,

    /// Class of the product image elements
    #[serde(rename = "image-selector", default)]
    pub image_selector: String,
}

/// Network and concurrency settings
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of product pages extracted at once
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Total timeout per request, in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the exported record file
    #[serde(default = "default_output_path")]
    pub path: String,

    /// Exporter used for the record file
    #[serde(default)]
    pub format: OutputFormat,

    /// Directory downloaded images are written to
    #[serde(rename = "image-dir", default = "default_image_dir")]
    pub image_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: OutputFormat::default(),
            image_dir: default_image_dir(),
        }
    }
}

/// Supported record file formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Sqlite,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Sqlite => write!(f, "sqlite"),
        }
    }
}

fn default_max_concurrency() -> u32 {
    16
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("catalog-harvester/{}", env!("CARGO_PKG_VERSION"))
}

fn default_output_path() -> String {
    "products.csv".to_string()
}

fn default_image_dir() -> String {
    "images".to_string()
}
