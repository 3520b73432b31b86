//! Typed progress and log events
//!
//! The pipeline never touches presentation state. It emits [`HarvestEvent`]s
//! into an [`EventSink`]; whoever holds the receiving end decides how to show
//! them. Every event is also mirrored to `tracing`.

use crate::record::ProductRecord;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Events emitted while a harvest runs
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    /// A listing page could not be fetched; discovery continues
    PageFetchFailed { page_index: u32, reason: String },

    /// A listing page attempt finished (success or failure)
    DiscoveryProgress { completed: u32, total: u32 },

    /// Text matched by the first field selector on a product page
    TitleFound { link: String, title: String },

    /// A product page could not be fetched; its record carries the error
    ProductFetchFailed { link: String, reason: String },

    /// An image was written to the image directory
    ImageStored { url: String, path: PathBuf },

    /// An image could not be fetched, decoded or written
    ImageFetchFailed { url: String, reason: String },

    /// Two different image URLs map to the same stored file name
    ImageNameCollision {
        file_name: String,
        previous_url: String,
        url: String,
    },

    /// A product finished extracting (fully, partially or with a fetch error)
    ExtractionCompleted { record: Box<ProductRecord> },

    /// A product task finished
    ExtractionProgress { completed: usize, total: usize },

    /// Cancellation stopped dispatch before every link was started
    DispatchCancelled { dispatched: usize, total: usize },

    /// The batch is done; no further events follow
    BatchFinished { record_count: usize },
}

impl HarvestEvent {
    /// Progress fraction for progress events
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::DiscoveryProgress { completed, total } if *total > 0 => {
                Some(*completed as f64 / *total as f64)
            }
            Self::ExtractionProgress { completed, total } if *total > 0 => {
                Some(*completed as f64 / *total as f64)
            }
            _ => None,
        }
    }
}

/// Shared, cloneable handle for emitting events
///
/// Each event is sent as one message, so concurrent tasks never interleave
/// partial output. A dropped receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<HarvestEvent>>,
}

impl EventSink {
    /// Creates a sink and the receiver that observes it
    pub fn channel() -> (Self, UnboundedReceiver<HarvestEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    /// Wraps an existing sender
    pub fn new(sender: UnboundedSender<HarvestEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A sink that only logs
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Logs the event and forwards it to the receiver, if any
    pub fn emit(&self, event: HarvestEvent) {
        log_event(&event);

        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                tracing::trace!("Event receiver dropped, event discarded");
            }
        }
    }
}

fn log_event(event: &HarvestEvent) {
    match event {
        HarvestEvent::PageFetchFailed { page_index, reason } => {
            tracing::warn!("Failed to fetch listing page {}: {}", page_index, reason);
        }
        HarvestEvent::DiscoveryProgress { completed, total } => {
            tracing::debug!("Discovery progress: {}/{}", completed, total);
        }
        HarvestEvent::TitleFound { link, title } => {
            tracing::info!("Title found on {}: {}", link, title);
        }
        HarvestEvent::ProductFetchFailed { link, reason } => {
            tracing::warn!("Failed to fetch {}: {}", link, reason);
        }
        HarvestEvent::ImageStored { url, path } => {
            tracing::debug!("Stored image {} as {}", url, path.display());
        }
        HarvestEvent::ImageFetchFailed { url, reason } => {
            tracing::warn!("Image {} not stored: {}", url, reason);
        }
        HarvestEvent::ImageNameCollision {
            file_name,
            previous_url,
            url,
        } => {
            tracing::warn!(
                "Image file name '{}' reused: {} overwrote {}",
                file_name,
                url,
                previous_url
            );
        }
        HarvestEvent::ExtractionCompleted { record } => {
            tracing::debug!(
                "Extracted {} ({} fragments, {} images)",
                record.link,
                record.content_fragments.len(),
                record.images.len()
            );
        }
        HarvestEvent::ExtractionProgress { completed, total } => {
            tracing::debug!("Extraction progress: {}/{}", completed, total);
        }
        HarvestEvent::DispatchCancelled { dispatched, total } => {
            tracing::warn!(
                "Harvest cancelled after dispatching {} of {} products",
                dispatched,
                total
            );
        }
        HarvestEvent::BatchFinished { record_count } => {
            tracing::info!("Batch finished with {} records", record_count);
        }
    }
}
