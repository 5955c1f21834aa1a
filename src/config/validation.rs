use crate::config::types::{Config, CrawlConfig, HttpConfig, OutputConfig, WorkerConfig};
use crate::ConfigError;
use url::Url;

/// Largest accepted worker pool size
const MAX_WORKERS: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_worker_config(&config.workers)?;
    validate_output_config(&config.output)?;
    validate_http_config(&config.http)?;
    Ok(())
}

/// Validates the crawl root
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.root_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "root_url cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(config.root_url.trim()).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid root URL '{}': {}", config.root_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Root URL '{}' must use HTTP or HTTPS",
            config.root_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Root URL '{}' has no host",
            config.root_url
        )));
    }

    Ok(())
}

/// Validates worker pool sizes
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    for (name, count) in [
        ("page_workers", config.page_workers),
        ("asset_workers", config.asset_workers),
        ("save_workers", config.save_workers),
    ] {
        if count < 1 || count > MAX_WORKERS {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_WORKERS, count
            )));
        }
    }

    if config.save_queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "save_queue_capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.archive_root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "archive_root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP client settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 || config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be > 0, got connect={}s request={}s",
            config.connect_timeout_secs, config.request_timeout_secs
        )));
    }

    Ok(())
}
