//! Harvest coordinator - wires the pipeline together
//!
//! The coordinator owns everything a run shares: the validated extraction
//! config, the HTTP client, the image store, the event sink and the
//! cancellation token. A run is:
//! 1. Validate the extraction config (before any network activity)
//! 2. Discover product links across the listing pages
//! 3. Extract every product with bounded concurrency
//! 4. Return the records in completion order

use crate::config::{validate_extraction, Config, ExtractionConfig};
use crate::crawler::discovery::discover_links;
use crate::crawler::extractor::ProductExtractor;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::images::ImageStore;
use crate::crawler::orchestrator::run_batch;
use crate::events::{EventSink, HarvestEvent};
use crate::record::ProductRecord;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Main harvest coordinator structure
pub struct Coordinator {
    extraction: Arc<ExtractionConfig>,
    client: Client,
    images: Arc<ImageStore>,
    max_concurrency: usize,
    events: EventSink,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `events` - Sink that receives progress and log events
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The extraction config is invalid or the HTTP
    ///   client could not be built
    pub fn new(config: &Config, events: EventSink) -> crate::Result<Self> {
        validate_extraction(&config.extraction)?;

        let client = build_http_client(&config.crawler)?;

        Ok(Self {
            extraction: Arc::new(config.extraction.clone()),
            client,
            images: Arc::new(ImageStore::new(&config.output.image_dir)),
            max_concurrency: config.crawler.max_concurrency.max(1) as usize,
            events,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that cancels this run when triggered
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs discovery and extraction
    ///
    /// Individual page, product and image failures never abort the run; they
    /// surface as events and as `fetch_error` on the affected records.
    pub async fn run(&self) -> Vec<ProductRecord> {
        let start_time = Instant::now();
        tracing::info!(
            "Fetching links from {} listing pages of {}",
            self.extraction.page_count,
            self.extraction.base_url
        );

        let links = discover_links(&self.client, &self.extraction, &self.events, &self.cancel).await;

        if self.cancel.is_cancelled() {
            tracing::info!(
                "Cancelled during discovery, skipping extraction of {} links",
                links.len()
            );
            self.events.emit(HarvestEvent::BatchFinished { record_count: 0 });
            return Vec::new();
        }

        tracing::info!("Extracting data from {} product pages", links.len());
        let extractor = Arc::new(ProductExtractor::new(
            self.client.clone(),
            Arc::clone(&self.extraction),
            Arc::clone(&self.images),
            self.events.clone(),
        ));

        let records = run_batch(
            &links,
            extractor,
            self.max_concurrency,
            &self.events,
            &self.cancel,
        )
        .await;

        let failed = records.iter().filter(|r| !r.is_fetched()).count();
        tracing::info!(
            "Harvest completed: {} records ({} failed) in {:?}",
            records.len(),
            failed,
            start_time.elapsed()
        );

        records
    }
}

/// Runs a complete harvest
///
/// # Example
///
/// ```no_run
/// use catalog_harvester::config::load_config;
/// use catalog_harvester::crawler::run_harvest;
/// use catalog_harvester::events::EventSink;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let records = run_harvest(&config, EventSink::disabled()).await?;
/// println!("{} records", records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: &Config,
    events: EventSink,
) -> crate::Result<Vec<ProductRecord>> {
    let coordinator = Coordinator::new(config, events)?;
    Ok(coordinator.run().await)
}
