use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and validates a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stored with each run so that a resumed run can be traced back
/// to the exact configuration it was started with.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its content hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
seeds = ["https://example.com/start"]

[engine]
max-concurrency = 8
max-attempts = 3
fetch-timeout-ms = 30000
checkpoint-interval-secs = 30
max-depth = 3

[politeness]
per-host-rate = 2.0
per-host-burst = 4.0

[retry]
backoff-base-ms = 500
backoff-cap-ms = 60000

[output]
storage-path = "./trawline.db"

[scope]
allow = ["example.com"]
fingerprint = "url"

[[extract.fields]]
name = "title"
selector = "title"
"#;

    #[test]
    fn load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.engine.max_concurrency, 8);
        assert_eq!(config.politeness.per_host_rate, 2.0);
        assert_eq!(config.seeds.len(), 1);
        assert_eq!(config.extract.fields.len(), 1);
        assert_eq!(config.extract.fields[0].name, "title");
    }

    #[test]
    fn load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/trawline.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml() {
        let file = create_temp_config("not toml at all {{{");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_config_rejects_zero_concurrency() {
        let bad = VALID_CONFIG.replace("max-concurrency = 8", "max-concurrency = 0");
        let file = create_temp_config(&bad);
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn config_hash_is_stable() {
        let file = create_temp_config("same content");
        let h1 = compute_config_hash(file.path()).unwrap();
        let h2 = compute_config_hash(file.path()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn config_hash_differs_across_content() {
        let f1 = create_temp_config("content 1");
        let f2 = create_temp_config("content 2");
        assert_ne!(
            compute_config_hash(f1.path()).unwrap(),
            compute_config_hash(f2.path()).unwrap()
        );
    }
}
