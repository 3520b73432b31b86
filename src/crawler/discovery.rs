//! Link discovery over numbered listing pages
//!
//! Listing pages are fetched one at a time, `{base}/page/1/` through
//! `{base}/page/{page_count}/`. A page that fails is reported and skipped.

use crate::config::ExtractionConfig;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::parser::{element_attr, resolve_link, Document};
use crate::events::{EventSink, HarvestEvent};
use crate::record::LinkSet;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Builds the URL of listing page `index`
pub fn listing_page_url(base_url: &str, index: u32) -> String {
    format!("{}/page/{}/", base_url.trim_end_matches('/'), index)
}

/// Walks every listing page and collects the de-duplicated product links
///
/// Emits `PageFetchFailed` for each page that cannot be fetched and
/// `DiscoveryProgress` after every page attempt. Stops early, with the links
/// found so far, once `cancel` fires.
pub async fn discover_links(
    client: &Client,
    config: &ExtractionConfig,
    events: &EventSink,
    cancel: &CancellationToken,
) -> LinkSet {
    let total = config.page_count;
    let mut links = LinkSet::new();

    for index in 1..=total {
        if cancel.is_cancelled() {
            tracing::info!("Discovery cancelled before listing page {}", index);
            break;
        }

        let url = listing_page_url(&config.base_url, index);
        match fetch_page(client, &url).await {
            Ok(body) => {
                let found = collect_product_links(&body, &url, &config.link_selector);
                tracing::debug!("Listing page {} yielded {} links", index, found.len());
                links.extend(found);
            }
            Err(e) => {
                events.emit(HarvestEvent::PageFetchFailed {
                    page_index: index,
                    reason: e.to_string(),
                });
            }
        }

        events.emit(HarvestEvent::DiscoveryProgress {
            completed: index,
            total,
        });
    }

    tracing::info!("Discovered {} unique product links", links.len());
    links
}

/// Extracts product links from one listing page
///
/// Only `<a>` elements matching `link_selector` count. Hrefs are resolved
/// against `page_url`; values that do not resolve are skipped.
pub fn collect_product_links(html: &str, page_url: &str, link_selector: &str) -> Vec<String> {
    let base = match Url::parse(page_url) {
        Ok(base) => base,
        Err(e) => {
            tracing::debug!("Cannot resolve links on {}: {}", page_url, e);
            return Vec::new();
        }
    };

    let document = Document::parse(html);
    document
        .find_all_tagged("a", link_selector)
        .into_iter()
        .filter_map(|anchor| element_attr(anchor, "href"))
        .filter_map(|href| {
            let resolved = resolve_link(href, &base);
            if resolved.is_none() {
                tracing::debug!("Skipping unresolvable product link '{}'", href);
            }
            resolved
        })
        .collect()
}
