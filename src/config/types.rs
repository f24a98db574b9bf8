use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Trawline
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seed URLs the crawl starts from when there is no checkpoint to resume
    #[serde(default)]
    pub seeds: Vec<String>,

    pub engine: EngineConfig,
    pub politeness: PolitenessConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,

    #[serde(default)]
    pub scope: ScopeConfig,

    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Worker pool and task lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Size of the worker pool
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: u32,

    /// Retry ceiling: a task is terminally failed once its attempt count
    /// reaches this value
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Per-request deadline (milliseconds)
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,

    /// How often the frontier is checkpointed (seconds)
    #[serde(rename = "checkpoint-interval-secs")]
    pub checkpoint_interval_secs: u64,

    /// Maximum depth for discovered follow-up tasks
    #[serde(rename = "max-depth")]
    pub max_depth: u32,
}

impl EngineConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }
}

/// Per-host rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Token refill rate, in tokens (requests) per second
    #[serde(rename = "per-host-rate")]
    pub per_host_rate: f64,

    /// Token bucket capacity (burst allowance)
    #[serde(rename = "per-host-burst")]
    pub per_host_burst: f64,
}

/// Retry backoff timing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Base delay before the first retry (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Ceiling on the backoff delay (milliseconds)
    #[serde(rename = "backoff-cap-ms")]
    pub backoff_cap_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding records, dedup state and checkpoints
    #[serde(rename = "storage-path")]
    pub storage_path: String,
}

/// Fingerprint policy for record deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintPolicy {
    /// Fingerprint is a hash of the normalized source URL
    Url,
    /// Fingerprint is a hash of the canonicalized record content
    Content,
}

/// URL scope configuration: which discovered hosts may be followed
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Host patterns to follow ("example.com" or "*.example.com").
    /// Empty means: restrict to the hosts of the seed URLs.
    #[serde(default)]
    pub allow: Vec<String>,

    /// Host patterns never followed, even if allowed
    #[serde(default)]
    pub deny: Vec<String>,

    /// Record dedup fingerprint policy
    #[serde(default = "default_fingerprint_policy")]
    pub fingerprint: FingerprintPolicy,
}

fn default_fingerprint_policy() -> FingerprintPolicy {
    FingerprintPolicy::Content
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            deny: Vec::new(),
            fingerprint: default_fingerprint_policy(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    pub name: String,
    pub version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full user agent string sent with every request
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.name, self.version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "trawline".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.invalid/trawline".to_string(),
            contact_email: "ops@example.invalid".to_string(),
        }
    }
}

/// Default extractor configuration: which fields to pull out of each page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

/// A single named CSS selector producing one record field
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub selector: String,
}
