//! Batch orchestration
//!
//! Runs one extraction per discovered link with a bounded number in flight.
//! Records are collected in completion order; a progress event follows every
//! completion. Cancellation stops dispatch and lets running extractions
//! finish.

use crate::crawler::extractor::ProductExtractor;
use crate::events::{EventSink, HarvestEvent};
use crate::record::{LinkSet, ProductRecord};
use crate::FetchError;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Extracts every link with at most `max_concurrency` extractions in flight
pub async fn run_batch(
    links: &LinkSet,
    extractor: Arc<ProductExtractor>,
    max_concurrency: usize,
    events: &EventSink,
    cancel: &CancellationToken,
) -> Vec<ProductRecord> {
    run_batch_with(links, max_concurrency, events, cancel, move |link| {
        let extractor = Arc::clone(&extractor);
        async move { extractor.extract(&link).await }
    })
    .await
}

/// Bounded batch runner over any per-link extraction future
///
/// Every dispatched link produces exactly one record, even if its task
/// panics.
pub async fn run_batch_with<F, Fut>(
    links: &LinkSet,
    max_concurrency: usize,
    events: &EventSink,
    cancel: &CancellationToken,
    extract: F,
) -> Vec<ProductRecord>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = ProductRecord> + Send + 'static,
{
    let total = links.len();
    let mut records = Vec::with_capacity(total);

    if total == 0 {
        events.emit(HarvestEvent::BatchFinished { record_count: 0 });
        return records;
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks: JoinSet<ProductRecord> = JoinSet::new();
    let mut pending = links.iter().cloned().peekable();
    let mut dispatched = 0;
    let mut stopped = false;

    tracing::info!(
        "Extracting {} products with up to {} in flight",
        total,
        max_concurrency.max(1)
    );

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled(), if !stopped && pending.peek().is_some() => {
                stopped = true;
                events.emit(HarvestEvent::DispatchCancelled { dispatched, total });
            }

            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                match joined {
                    Ok(record) => {
                        records.push(record.clone());
                        events.emit(HarvestEvent::ExtractionCompleted {
                            record: Box::new(record),
                        });
                        events.emit(HarvestEvent::ExtractionProgress {
                            completed: records.len(),
                            total,
                        });
                    }
                    Err(e) => tracing::error!("Extraction task failed to join: {}", e),
                }
            }

            permit = Arc::clone(&semaphore).acquire_owned(), if !stopped && pending.peek().is_some() => {
                let permit = match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        stopped = true;
                        continue;
                    }
                };
                let Some(link) = pending.next() else {
                    continue;
                };

                dispatched += 1;
                let future = AssertUnwindSafe(extract(link.clone())).catch_unwind();
                tasks.spawn(async move {
                    let record = match future.await {
                        Ok(record) => record,
                        Err(_) => ProductRecord::failed(
                            link.clone(),
                            FetchError::Aborted {
                                url: link,
                                message: "extraction task panicked".to_string(),
                            },
                        ),
                    };
                    drop(permit);
                    record
                });
            }

            else => break,
        }
    }

    events.emit(HarvestEvent::BatchFinished {
        record_count: records.len(),
    });
    records
}
