use crate::config::types::{Config, StorageTarget};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

const ENV_SEED_URL: &str = "NEWS_WAVE_SEED_URL";
const ENV_SOURCE: &str = "NEWS_WAVE_SOURCE";
const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Loads and parses a configuration file from the given path
///
/// Values from the process environment override the file (see
/// [`apply_env_overrides`]).
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
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parses configuration text, applies overrides from `env`, and validates
pub fn parse_config<F>(content: &str, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);
    validate(&config)?;
    Ok(config)
}

/// Applies environment overrides to a parsed configuration
///
/// * `NEWS_WAVE_SEED_URL` and `NEWS_WAVE_SOURCE` replace the crawler values.
/// * `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` fill remote credentials
///   that the file leaves out.
pub fn apply_env_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(seed) = env(ENV_SEED_URL).filter(|v| !v.is_empty()) {
        config.crawler.seed_url = seed;
    }

    if let Some(source) = env(ENV_SOURCE).filter(|v| !v.is_empty()) {
        config.crawler.source = source;
    }

    if let StorageTarget::Remote(remote) = &mut config.storage {
        if remote.access_key_id.is_none() {
            remote.access_key_id = env(ENV_ACCESS_KEY_ID).filter(|v| !v.is_empty());
        }
        if remote.secret_access_key.is_none() {
            remote.secret_access_key = env(ENV_SECRET_ACCESS_KEY).filter(|v| !v.is_empty());
        }
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded with every wave so that results can be traced back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
