//! Catalog Harvester main entry point
//!
//! This is the command-line interface for the product harvester.

use anyhow::Context;
use catalog_harvester::config::{load_config_with_hash, Config, OutputFormat};
use catalog_harvester::crawler::{listing_page_url, Coordinator};
use catalog_harvester::events::{EventSink, HarvestEvent};
use catalog_harvester::output::{
    export_records, open_output, print_statistics, HarvestStatistics, RunInfo,
};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

/// Catalog Harvester: structured product extraction from paginated catalogs
///
/// Walks the numbered listing pages of a catalog, extracts configured fields
/// from every product page it finds, downloads product images and exports the
/// records as CSV or SQLite.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvester")]
#[command(version)]
#[command(about = "Harvest structured product records from a paginated catalog", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,

    /// Override the output path from the config
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Override the output format from the config
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Override the maximum number of concurrent product extractions
    #[arg(long, value_name = "N")]
    max_concurrency: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config, config_hash, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvester=info,warn"),
            1 => EnvFilter::new("catalog_harvester=debug,info"),
            2 => EnvFilter::new("catalog_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(max_concurrency) = cli.max_concurrency {
        config.crawler.max_concurrency = max_concurrency;
    }

    catalog_harvester::config::validate(config).context("invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: shows the plan without any network activity
fn handle_dry_run(config: &Config) {
    let extraction = &config.extraction;

    println!("=== Catalog Harvester Dry Run ===\n");

    println!("Listing pages ({}):", extraction.page_count);
    println!("  {}", listing_page_url(&extraction.base_url, 1));
    if extraction.page_count > 1 {
        println!(
            "  ... {}",
            listing_page_url(&extraction.base_url, extraction.page_count)
        );
    }

    println!("\nSelectors:");
    println!("  Link: {}", display_selector(&extraction.link_selector));
    for (index, selector) in extraction.field_selectors.iter().enumerate() {
        println!("  Field {}: {}", index + 1, display_selector(selector));
    }
    println!("  Table: {}", display_selector(&extraction.table_selector));
    println!("  Price: {}", display_selector(&extraction.price_selector));
    println!(
        "  Short description: {}",
        display_selector(&extraction.short_description_selector)
    );
    println!("  Image: {}", display_selector(&extraction.image_selector));

    println!("\nCrawler:");
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nOutput:");
    println!("  Records: {} ({})", config.output.path, config.output.format);
    println!("  Images: {}", config.output.image_dir);

    println!("\n✓ Configuration is valid");
}

fn display_selector(selector: &str) -> &str {
    if selector.is_empty() {
        "(skipped)"
    } else {
        selector
    }
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: String, quiet: bool) -> anyhow::Result<()> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let (events, receiver) = EventSink::channel();

    let coordinator = Coordinator::new(&config, events).context("failed to start harvest")?;

    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight products");
            cancel.cancel();
        }
    });

    let display = tokio::spawn(display_events(receiver, quiet));

    let mut records = coordinator.run().await;
    drop(coordinator);
    if let Err(e) = display.await {
        tracing::warn!("Progress display stopped: {}", e);
    }

    let run = RunInfo {
        config_hash,
        base_url: config.extraction.base_url.clone(),
        started_at,
    };
    let mut handler = open_output(&config.output, &run)
        .with_context(|| format!("failed to open {}", config.output.path))?;
    export_records(handler.as_mut(), &mut records)
        .with_context(|| format!("failed to write {}", config.output.path))?;
    tracing::info!("Data saved to {}", config.output.path);

    if !quiet {
        println!();
        print_statistics(&HarvestStatistics::from_records(&records));
    }

    Ok(())
}

/// Presentation side of the event channel
///
/// Ends when the batch finishes or every sender is dropped.
async fn display_events(mut receiver: UnboundedReceiver<HarvestEvent>, quiet: bool) {
    while let Some(event) = receiver.recv().await {
        match &event {
            HarvestEvent::DiscoveryProgress { completed, total } if !quiet => {
                println!(
                    "[links {:>3.0}%] listing page {}/{}",
                    event.fraction().unwrap_or(0.0) * 100.0,
                    completed,
                    total
                );
            }
            HarvestEvent::ExtractionProgress { completed, total } if !quiet => {
                println!(
                    "[data  {:>3.0}%] product {}/{}",
                    event.fraction().unwrap_or(0.0) * 100.0,
                    completed,
                    total
                );
            }
            HarvestEvent::BatchFinished { record_count } => {
                if !quiet {
                    println!("Extraction finished: {} records", record_count);
                }
                break;
            }
            _ => {}
        }
    }
}
