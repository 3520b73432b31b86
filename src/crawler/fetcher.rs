//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester:
//! - Building the shared HTTP client (user agent, timeouts, compression)
//! - GET requests for listing and product pages
//! - GET requests for image payloads
//! - Error classification into [`FetchError`]
//!
//! Failed requests are never retried.

use crate::config::CrawlerConfig;
use crate::FetchError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use catalog_harvester::config::CrawlerConfig;
/// use catalog_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches an HTML page and returns its body
///
/// Any 2xx status counts as success.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    tracing::debug!("Fetching page: {}", url);

    let response = send(client, url).await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, &e))
}

/// Fetches a binary payload (an image)
///
/// Only `200 OK` counts as success.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
    tracing::debug!("Fetching image: {}", url);

    let response = send(client, url).await?;
    let status = response.status();

    if status != StatusCode::OK {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(url, &e))?;
    Ok(bytes.to_vec())
}

async fn send(client: &Client, url: &str) -> Result<Response, FetchError> {
    client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, &e))
}
