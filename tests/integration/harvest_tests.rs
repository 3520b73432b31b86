//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small catalog and run discovery,
//! extraction, image storage and export end-to-end.

use catalog_harvester::config::{Config, CrawlerConfig, ExtractionConfig, OutputConfig};
use catalog_harvester::crawler::{build_http_client, discover_links, run_harvest, Coordinator};
use catalog_harvester::events::{EventSink, HarvestEvent};
use catalog_harvester::output::{export_records, open_output, RunInfo};
use catalog_harvester::FetchError;
use std::io::Cursor;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for a catalog served under `{base}/catalog`
fn create_test_config(base_url: &str, page_count: u32, image_dir: &str) -> Config {
    Config {
        extraction: ExtractionConfig {
            base_url: format!("{}/catalog", base_url),
            page_count,
            link_selector: "product-link".to_string(),
            field_selectors: vec!["product_title".to_string(), "subtitle".to_string()],
            table_selector: "shop_attributes".to_string(),
            price_selector: "price-removed".to_string(),
            short_description_selector: "short-description".to_string(),
            image_selector: "wp-post-image".to_string(),
        },
        crawler: CrawlerConfig {
            max_concurrency: 4,
            request_timeout_secs: 1,
            user_agent: "HarvestTestBot/1.0".to_string(),
        },
        output: OutputConfig {
            image_dir: image_dir.to_string(),
            ..Default::default()
        },
    }
}

fn listing_page(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a class="product-link" href="{}">item</a>"#, href))
        .collect();
    format!(
        r#"<html><body>{}<a class="nav" href="/about">About</a></body></html>"#,
        anchors
    )
}

fn product_page(title: &str, image_srcs: &[&str]) -> String {
    let images: String = image_srcs
        .iter()
        .map(|src| format!(r#"<img class="wp-post-image" src="{}">"#, src))
        .collect();
    format!(
        r#"<html><body>
            <h1 class="product_title entry-title">{}</h1>
            <p class="subtitle">Condensing</p>
            <div class="price-removed"><del>12,500,000</del><ins>11,900,000</ins></div>
            <div class="short-description"><ul><li>Two year warranty</li></ul></div>
            <table class="shop_attributes"><tr><th>Power</th><td>24 kW</td></tr></table>
            {}
        </body></html>"#,
        title, images
    )
}

fn png_bytes() -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn drain(receiver: &mut UnboundedReceiver<HarvestEvent>) -> Vec<HarvestEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_discovery_deduplicates_across_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/catalog/page/1/",
        listing_page(&["/p/a/", "/p/b/", "/p/c/", "/p/a/"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/catalog/page/2/",
        listing_page(&["/p/c/", "/p/d/", &format!("{}/p/e/", base_url)]),
    )
    .await;

    let config = create_test_config(&base_url, 2, "unused");
    let client = build_http_client(&config.crawler).expect("Failed to build client");
    let (sink, mut receiver) = EventSink::channel();

    let links = discover_links(
        &client,
        &config.extraction,
        &sink,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(links.len(), 5, "Duplicate links should collapse");
    for slug in ["a", "b", "c", "d", "e"] {
        assert!(links.contains(&format!("{}/p/{}/", base_url, slug)));
    }
    assert!(!links.iter().any(|link| link.ends_with("/about")));

    let events = drain(&mut receiver);
    assert_eq!(
        events,
        vec![
            HarvestEvent::DiscoveryProgress {
                completed: 1,
                total: 2
            },
            HarvestEvent::DiscoveryProgress {
                completed: 2,
                total: 2
            },
        ]
    );
}

#[tokio::test]
async fn test_discovery_continues_past_failed_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/catalog/page/1/", listing_page(&["/p/a/"])).await;
    Mock::given(method("GET"))
        .and(path("/catalog/page/2/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/catalog/page/3/", listing_page(&["/p/b/"])).await;

    let config = create_test_config(&base_url, 3, "unused");
    let client = build_http_client(&config.crawler).expect("Failed to build client");
    let (sink, mut receiver) = EventSink::channel();

    let links = discover_links(
        &client,
        &config.extraction,
        &sink,
        &CancellationToken::new(),
    )
    .await;
    assert_eq!(links.len(), 2);

    let events = drain(&mut receiver);
    let failed: Vec<u32> = events
        .iter()
        .filter_map(|event| match event {
            HarvestEvent::PageFetchFailed { page_index, .. } => Some(*page_index),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![2]);

    let progress = events
        .iter()
        .filter(|event| matches!(event, HarvestEvent::DiscoveryProgress { .. }))
        .count();
    assert_eq!(progress, 3, "Progress is reported for failed pages too");
}

#[tokio::test]
async fn test_full_harvest() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp = TempDir::new().expect("Failed to create temp dir");
    let image_dir = temp.path().join("images");

    mount_html(
        &mock_server,
        "/catalog/page/1/",
        listing_page(&["/p/boiler/", "/p/heater/", "/p/slow/", "/p/gone/"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/p/boiler/",
        product_page("Wall Boiler", &["/img/boiler.png", "/img/missing.png"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/p/heater/",
        product_page("Water Heater", &["/img/broken.png"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/p/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(product_page("Slow", &[]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/boiler.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/broken.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
        .mount(&mock_server)
        .await;
    // /p/gone/ and /img/missing.png are not mounted and answer 404

    let config = create_test_config(&base_url, 1, &image_dir.display().to_string());
    let (sink, mut receiver) = EventSink::channel();

    let mut records = run_harvest(&config, sink)
        .await
        .expect("Harvest should run");
    records.sort_by(|a, b| a.link.cmp(&b.link));

    assert_eq!(records.len(), 4, "Every discovered link yields one record");

    let boiler = &records[0];
    assert_eq!(boiler.link, format!("{}/p/boiler/", base_url));
    assert!(boiler.fetch_error.is_none());
    assert_eq!(boiler.content_fragments, vec!["Wall Boiler", "Condensing"]);
    assert_eq!(boiler.price.as_deref(), Some("12,500,000"));
    assert_eq!(boiler.short_description_items, vec!["Two year warranty"]);
    assert_eq!(boiler.table_rows, vec![vec!["Power", "24 kW"]]);
    assert_eq!(
        boiler.images,
        vec![
            format!("{}/img/boiler.png", base_url),
            format!("{}/img/missing.png", base_url),
        ],
        "Image URLs are recorded whether or not the download succeeds"
    );

    let gone = &records[1];
    assert!(matches!(
        gone.fetch_error,
        Some(FetchError::Status { status: 404, .. })
    ));

    let heater = &records[2];
    assert!(heater.fetch_error.is_none());
    assert_eq!(heater.images, vec![format!("{}/img/broken.png", base_url)]);

    let slow = &records[3];
    assert!(matches!(slow.fetch_error, Some(FetchError::Timeout { .. })));
    assert!(slow.content_fragments.is_empty());
    assert!(slow.price.is_none());
    assert!(slow.images.is_empty());

    assert!(image_dir.join("boiler.png").exists());
    assert!(!image_dir.join("missing.png").exists());
    assert!(!image_dir.join("broken.png").exists());

    let events = drain(&mut receiver);
    assert_eq!(
        events.last(),
        Some(&HarvestEvent::BatchFinished { record_count: 4 })
    );

    let image_failures: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            HarvestEvent::ImageFetchFailed { url, .. } => Some(url.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(image_failures.len(), 2);

    let titles: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            HarvestEvent::TitleFound { title, .. } => Some(title.as_str()),
            _ => None,
        })
        .collect();
    assert!(titles.contains(&"Wall Boiler"));
    assert!(titles.contains(&"Water Heater"));
    assert!(!titles.contains(&"Condensing"));

    let progress: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            HarvestEvent::ExtractionProgress { completed, total } => {
                assert_eq!(*total, 4);
                Some(*completed)
            }
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![1, 2, 3, 4]);

    let failed_products = events
        .iter()
        .filter(|event| matches!(event, HarvestEvent::ProductFetchFailed { .. }))
        .count();
    assert_eq!(failed_products, 2);

    let csv_path = temp.path().join("products.csv");
    let output = OutputConfig {
        path: csv_path.display().to_string(),
        ..config.output.clone()
    };
    let mut handler = open_output(&output, &RunInfo::default()).expect("Failed to open output");
    export_records(handler.as_mut(), &mut records).expect("Failed to export");

    let text = std::fs::read_to_string(&csv_path).expect("Failed to read CSV");
    assert_eq!(text.lines().count(), 5, "Header plus one row per record");
    assert!(text.contains("Wall Boiler | Condensing"));
    assert!(text.contains("timeout fetching"));
}

#[tokio::test]
async fn test_unreachable_catalog_yields_empty_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&base_url, 2, &temp.path().display().to_string());
    let (sink, mut receiver) = EventSink::channel();

    let records = run_harvest(&config, sink).await.expect("Harvest should run");
    assert!(records.is_empty());

    let events = drain(&mut receiver);
    let failed_pages = events
        .iter()
        .filter(|event| matches!(event, HarvestEvent::PageFetchFailed { .. }))
        .count();
    assert_eq!(failed_pages, 2);
    assert_eq!(
        events.last(),
        Some(&HarvestEvent::BatchFinished { record_count: 0 })
    );
}

#[tokio::test]
async fn test_shared_image_name_reported_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp = TempDir::new().expect("Failed to create temp dir");

    mount_html(
        &mock_server,
        "/catalog/page/1/",
        listing_page(&["/p/first/", "/p/second/"]),
    )
    .await;
    mount_html(&mock_server, "/p/first/", product_page("First", &["/a/x.png"])).await;
    mount_html(&mock_server, "/p/second/", product_page("Second", &["/b/x.png"])).await;
    for route in ["/a/x.png", "/b/x.png"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&base_url, 1, &temp.path().display().to_string());
    let (sink, mut receiver) = EventSink::channel();
    let records = run_harvest(&config, sink).await.expect("Harvest should run");
    assert_eq!(records.len(), 2);

    let events = drain(&mut receiver);
    let collisions: Vec<(&str, &str, &str)> = events
        .iter()
        .filter_map(|event| match event {
            HarvestEvent::ImageNameCollision {
                file_name,
                previous_url,
                url,
            } => Some((file_name.as_str(), previous_url.as_str(), url.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(collisions.len(), 1);

    let (file_name, previous_url, url) = collisions[0];
    assert_eq!(file_name, "x.png");
    assert_ne!(previous_url, url);
    let stored = events
        .iter()
        .filter(|event| matches!(event, HarvestEvent::ImageStored { .. }))
        .count();
    assert_eq!(stored, 2);
    assert!(temp.path().join("x.png").exists());
}

#[tokio::test]
async fn test_cancel_during_discovery_skips_extraction() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/catalog/page/1/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&["/p/a/", "/p/b/"]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p/a/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("A", &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 3, &temp.path().display().to_string());
    let (sink, mut receiver) = EventSink::channel();
    let coordinator = Coordinator::new(&config, sink).expect("Failed to create coordinator");

    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let records = coordinator.run().await;
    assert!(records.is_empty());

    let events = drain(&mut receiver);
    assert_eq!(
        events,
        vec![
            HarvestEvent::DiscoveryProgress {
                completed: 1,
                total: 3
            },
            HarvestEvent::BatchFinished { record_count: 0 },
        ]
    );
}
