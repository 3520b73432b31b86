//! Product page extraction
//!
//! Turns one product URL into one [`ProductRecord`]. Extraction is best
//! effort: a page that cannot be fetched yields a record carrying the
//! [`FetchError`](crate::FetchError), and every field that does not match
//! simply stays empty.

use crate::config::ExtractionConfig;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::images::ImageStore;
use crate::crawler::parser::{descendants_named, element_attr, element_text, Document};
use crate::events::{EventSink, HarvestEvent};
use crate::record::ProductRecord;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Fetches product pages and extracts configured fields
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    client: Client,
    config: Arc<ExtractionConfig>,
    images: Arc<ImageStore>,
    events: EventSink,
}

impl ProductExtractor {
    /// Creates a new extractor
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `config` - Selectors to apply to every product page
    /// * `images` - Store that downloaded images are written to
    /// * `events` - Sink for progress and log events
    pub fn new(
        client: Client,
        config: Arc<ExtractionConfig>,
        images: Arc<ImageStore>,
        events: EventSink,
    ) -> Self {
        Self {
            client,
            config,
            images,
            events,
        }
    }

    /// Extracts one product page
    ///
    /// Never fails: a fetch failure is recorded in `fetch_error`, and image
    /// failures only produce events.
    pub async fn extract(&self, url: &str) -> ProductRecord {
        let body = match fetch_page(&self.client, url).await {
            Ok(body) => body,
            Err(e) => {
                self.events.emit(HarvestEvent::ProductFetchFailed {
                    link: url.to_string(),
                    reason: e.to_string(),
                });
                return ProductRecord::failed(url, e);
            }
        };

        let (record, title_count) = extract_parts(&body, url, &self.config);

        for title in record.content_fragments.iter().take(title_count) {
            self.events.emit(HarvestEvent::TitleFound {
                link: url.to_string(),
                title: title.clone(),
            });
        }

        for image_url in &record.images {
            self.store_image(image_url).await;
        }

        record
    }

    async fn store_image(&self, url: &str) {
        match self.images.fetch_image(&self.client, url).await {
            Ok(stored) => {
                if let Some(previous_url) = stored.overwrote.clone() {
                    self.events.emit(HarvestEvent::ImageNameCollision {
                        file_name: stored.file_name.clone(),
                        previous_url,
                        url: stored.url.clone(),
                    });
                }
                self.events.emit(HarvestEvent::ImageStored {
                    url: stored.url,
                    path: stored.path,
                });
            }
            Err(e) => {
                self.events.emit(HarvestEvent::ImageFetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Applies the configured selectors to an already fetched product page
///
/// Pure: no network access and no image downloads. Image sources are
/// resolved against `page_url` but not fetched.
pub fn extract_fields(html: &str, page_url: &str, config: &ExtractionConfig) -> ProductRecord {
    extract_parts(html, page_url, config).0
}

/// Extracts the record plus the number of fragments the first field
/// selector (the title) contributed
fn extract_parts(html: &str, page_url: &str, config: &ExtractionConfig) -> (ProductRecord, usize) {
    let document = Document::parse(html);
    let mut record = ProductRecord::new(page_url);
    let mut title_count = 0;

    for (index, selector) in config.field_selectors.iter().enumerate() {
        record
            .content_fragments
            .extend(document.find_all(selector).into_iter().map(element_text));
        if index == 0 {
            title_count = record.content_fragments.len();
        }
    }

    if let Some(table) = document.find_first_tagged("table", &config.table_selector) {
        for row in descendants_named(table, &["tr"]) {
            let cells = descendants_named(row, &["th", "td"])
                .into_iter()
                .map(element_text)
                .collect();
            record.table_rows.push(cells);
        }
    }

    if let Some(price) = document.find_first(&config.price_selector) {
        record.price = descendants_named(price, &["del"])
            .into_iter()
            .next()
            .map(element_text);
    }

    if let Some(description) = document.find_first(&config.short_description_selector) {
        record.short_description_items = descendants_named(description, &["li"])
            .into_iter()
            .map(element_text)
            .collect();
    }

    match Url::parse(page_url) {
        Ok(base) => {
            for image in document.find_all(&config.image_selector) {
                let src = element_attr(image, "src").map(str::trim).unwrap_or("");
                if src.is_empty() {
                    continue;
                }
                // Any scheme is kept; unfetchable ones fail later in the image store
                match base.join(src) {
                    Ok(absolute) => record.images.push(absolute.to_string()),
                    Err(e) => tracing::debug!("Skipping unresolvable image src '{}': {}", src, e),
                }
            }
        }
        Err(e) => tracing::debug!("Cannot resolve images on {}: {}", page_url, e),
    }

    (record, title_count)
}
