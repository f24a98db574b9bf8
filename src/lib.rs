//! Trawline: a checkpointed, politeness-aware scraping engine
//!
//! This crate implements a single-process crawl orchestration engine: a durable
//! task frontier, per-host token-bucket rate limiting, a concurrent
//! fetch/extract worker pipeline, fingerprint deduplication, and
//! checkpoint/resume so an interrupted run picks up where it left off without
//! persisting any record twice.

pub mod config;
pub mod dedup;
pub mod engine;
pub mod extract;
pub mod frontier;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for Trawline operations
#[derive(Debug, Error)]
pub enum TrawlineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] store::StoreError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Extraction error for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Corrupt checkpoint: {0}")]
    CorruptCheckpoint(String),

    #[error("No checkpoint to resume and no seeds configured")]
    NothingToCrawl,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Trawline operations
pub type Result<T> = std::result::Result<T, TrawlineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use engine::Orchestrator;
pub use frontier::{CrawlTask, Frontier};
