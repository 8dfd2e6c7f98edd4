use crate::config::types::{
    Config, CrawlerConfig, ExtractorConfig, FetcherConfig, GovernorConfig, OutputConfig,
};
use crate::crawler::parse_selector;
use crate::url::ListingTemplate;
use crate::ConfigError;
use std::collections::HashSet;

/// Upper bound on detail fetches in flight for one listing page
const MAX_DETAIL_CONCURRENCY: usize = 32;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_governor_config(&config.governor)?;
    validate_extractor_config(&config.extractor)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.partitions.is_empty() {
        return Err(ConfigError::Validation(
            "at least one partition is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for partition in &config.partitions {
        if partition.trim().is_empty() {
            return Err(ConfigError::Validation(
                "partition names cannot be blank".to_string(),
            ));
        }
        if !seen.insert(partition.as_str()) {
            return Err(ConfigError::Validation(format!(
                "partition '{}' is listed more than once",
                partition
            )));
        }
    }

    let template = ListingTemplate::parse(&config.listing_url_template)
        .map_err(|e| ConfigError::InvalidUrl(format!("listing-url-template: {}", e)))?;
    template
        .render(&config.partitions[0], 1)
        .map_err(|e| ConfigError::InvalidUrl(format!("listing-url-template: {}", e)))?;

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.record_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "record_cap must be >= 1, got {}",
            config.record_cap
        )));
    }

    if config.detail_concurrency < 1 || config.detail_concurrency > MAX_DETAIL_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "detail_concurrency must be between 1 and {}, got {}",
            MAX_DETAIL_CONCURRENCY, config.detail_concurrency
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_ms must be > 0".to_string(),
        ));
    }

    validate_range("backoff", config.backoff_min_ms, config.backoff_max_ms)?;

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user_agents must contain at least one entry".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates governor configuration
fn validate_governor_config(config: &GovernorConfig) -> Result<(), ConfigError> {
    validate_range(
        "page_delay",
        config.page_delay_min_ms,
        config.page_delay_max_ms,
    )
}

/// Validates that every selector parses
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    for (field, selector) in [
        ("listing-item", &config.listing_item),
        ("title", &config.title),
        ("price", &config.price),
        ("address", &config.address),
        ("area", &config.area),
        ("published", &config.published),
    ] {
        parse_selector(field, selector)?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "directory cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "file_prefix cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "file_prefix cannot contain path separators, got '{}'",
            config.file_prefix
        )));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_range(name: &str, min: u64, max: u64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::Validation(format!(
            "{}_min_ms ({}) must not exceed {}_max_ms ({})",
            name, min, name, max
        )));
    }
    Ok(())
}
