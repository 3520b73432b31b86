use crate::config::types::{Config, CrawlerConfig, ExtractionConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_extraction(&config.extraction)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the extraction parameters
///
/// Runs before any network activity; a failure here is the only error that
/// aborts a whole harvest.
pub fn validate_extraction(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.page_count < 1 {
        return Err(ConfigError::Validation(format!(
            "page_count must be >= 1, got {}",
            config.page_count
        )));
    }

    validate_base_url(&config.base_url)?;

    validate_selector("link_selector", &config.link_selector)?;
    for (index, selector) in config.field_selectors.iter().enumerate() {
        validate_selector(&format!("field_selectors[{}]", index), selector)?;
    }
    validate_selector("table_selector", &config.table_selector)?;
    validate_selector("price_selector", &config.price_selector)?;
    validate_selector(
        "short_description_selector",
        &config.short_description_selector,
    )?;
    validate_selector("image_selector", &config.image_selector)?;

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if config.image_dir.is_empty() {
        return Err(ConfigError::Validation(
            "image_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    if base_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "base_url cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            base_url
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' cannot have paths appended",
            base_url
        )));
    }

    Ok(())
}

/// Selectors may be empty but never contain control characters
fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if let Some(c) = selector.chars().find(|c| c.is_control()) {
        return Err(ConfigError::Validation(format!(
            "{} contains control character {:?}",
            name, c
        )));
    }
    Ok(())
}
