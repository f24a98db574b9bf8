//! Configuration loading and validation
//!
//! The engine is configured from a single TOML file. This module owns the
//! typed configuration surface, the loader (with a content hash used to tie a
//! run to the exact configuration it was started with), and validation.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    Config, EngineConfig, ExtractConfig, FieldRule, FingerprintPolicy, OutputConfig,
    PolitenessConfig, RetryConfig, ScopeConfig, UserAgentConfig,
};
pub use validation::validate;
