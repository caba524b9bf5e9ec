use crate::config::types::{
    ApiConfig, BackoffConfig, Config, HttpConfig, RateLimitConfig, ScrapeConfig, StorageConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_http_config(&config.http)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_backoff_config(&config.backoff)?;
    validate_scrape_config(&config.scrape)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates endpoint URLs
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("list-url", &config.list_url)?;
    validate_http_url("post-url-base", &config.post_url_base)?;

    if let Some(page_url) = &config.page_url {
        validate_http_url("page-url", page_url)?;
    }

    if config.success_code.trim().is_empty() {
        return Err(ConfigError::Validation(
            "success-code cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates the token bucket parameters
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if !config.qps.is_finite() || config.qps <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "qps must be a positive number, got {}",
            config.qps
        )));
    }

    if config.burst < 1 {
        return Err(ConfigError::Validation(format!(
            "burst must be >= 1, got {}",
            config.burst
        )));
    }

    validate_jitter("rate-limit", config.jitter_min, config.jitter_max)
}

fn validate_backoff_config(config: &BackoffConfig) -> Result<(), ConfigError> {
    if config.base_ms == 0 {
        return Err(ConfigError::Validation(
            "backoff base-ms must be >= 1".to_string(),
        ));
    }

    if config.max_delay_ms < config.base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff max-delay-ms ({}) must be >= base-ms ({})",
            config.max_delay_ms, config.base_ms
        )));
    }

    validate_jitter("backoff", config.jitter_min, config.jitter_max)
}

fn validate_scrape_config(config: &ScrapeConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page-size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("data-dir", &config.data_dir),
        ("checkpoint-file", &config.checkpoint_file),
        ("seen-file", &config.seen_file),
        ("export-file", &config.export_file),
        ("metrics-file", &config.metrics_file),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Jitter ratios must form a non-negative, ordered range
fn validate_jitter(section: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min.is_finite() && max.is_finite()) || min < 0.0 || max < min {
        return Err(ConfigError::Validation(format!(
            "{} jitter range must satisfy 0 <= jitter-min <= jitter-max, got [{}, {}]",
            section, min, max
        )));
    }
    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
