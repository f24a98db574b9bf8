//! Configuration validation
//!
//! Rejects configurations that would make the engine misbehave at runtime:
//! a zero-sized worker pool, a rate limiter that can never grant, a backoff
//! schedule whose base exceeds its cap, seeds that do not parse, or extractor
//! selectors that are not valid CSS.

use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine(config)?;
    validate_politeness(config)?;
    validate_retry(config)?;
    validate_output(config)?;
    validate_seeds(config)?;
    validate_scope(config)?;
    validate_extract(config)?;
    Ok(())
}

fn validate_engine(config: &Config) -> Result<(), ConfigError> {
    let engine = &config.engine;

    if engine.max_concurrency == 0 {
        return Err(ConfigError::Validation(
            "engine.max-concurrency must be at least 1".to_string(),
        ));
    }
    if engine.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "engine.max-attempts must be at least 1".to_string(),
        ));
    }
    if engine.fetch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "engine.fetch-timeout-ms must be positive".to_string(),
        ));
    }
    if engine.checkpoint_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "engine.checkpoint-interval-secs must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_politeness(config: &Config) -> Result<(), ConfigError> {
    let politeness = &config.politeness;

    if !(politeness.per_host_rate > 0.0) || !politeness.per_host_rate.is_finite() {
        return Err(ConfigError::Validation(
            "politeness.per-host-rate must be a positive number".to_string(),
        ));
    }
    if !(politeness.per_host_burst >= 1.0) || !politeness.per_host_burst.is_finite() {
        return Err(ConfigError::Validation(
            "politeness.per-host-burst must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_retry(config: &Config) -> Result<(), ConfigError> {
    let retry = &config.retry;

    if retry.backoff_base_ms == 0 {
        return Err(ConfigError::Validation(
            "retry.backoff-base-ms must be positive".to_string(),
        ));
    }
    if retry.backoff_cap_ms < retry.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "retry.backoff-cap-ms ({}) must not be below retry.backoff-base-ms ({})",
            retry.backoff_cap_ms, retry.backoff_base_ms
        )));
    }
    Ok(())
}

fn validate_output(config: &Config) -> Result<(), ConfigError> {
    if config.output.storage_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output.storage-path must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_seeds(config: &Config) -> Result<(), ConfigError> {
    for seed in &config.seeds {
        let url =
            Url::parse(seed).map_err(|e| ConfigError::InvalidSeed(format!("{}: {}", seed, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidSeed(format!(
                "{}: only http and https seeds are supported",
                seed
            )));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidSeed(format!("{}: no host", seed)));
        }
    }
    Ok(())
}

fn validate_scope(config: &Config) -> Result<(), ConfigError> {
    for pattern in config.scope.allow.iter().chain(config.scope.deny.iter()) {
        if pattern.trim().is_empty() {
            return Err(ConfigError::Validation(
                "scope patterns must not be empty".to_string(),
            ));
        }
        if pattern.contains('*') && !pattern.starts_with("*.") {
            return Err(ConfigError::Validation(format!(
                "scope pattern '{}': wildcard is only supported as a '*.' prefix",
                pattern
            )));
        }
    }
    Ok(())
}

fn validate_extract(config: &Config) -> Result<(), ConfigError> {
    for rule in &config.extract.fields {
        if rule.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "extract field names must not be empty".to_string(),
            ));
        }
        if scraper::Selector::parse(&rule.selector).is_err() {
            return Err(ConfigError::Validation(format!(
                "extract field '{}': invalid CSS selector '{}'",
                rule.name, rule.selector
            )));
        }
    }
    Ok(())
}
