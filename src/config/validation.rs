use crate::config::types::{
    Config, CrawlerConfig, ExtractorConfig, OutputConfig, RemoteStorageConfig, StorageTarget,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_extractor_config(&config.extractor)?;
    validate_storage_target(&config.storage)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed_url, e))
    })?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            config.seed_url
        )));
    }

    if config.source.trim().is_empty() {
        return Err(ConfigError::MissingRequiredField("crawler.source".to_string()));
    }

    if config.max_concurrent_tasks < 1 || config.max_concurrent_tasks > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_tasks must be between 1 and 100, got {}",
            config.max_concurrent_tasks
        )));
    }

    if config.wave_deadline_secs < 1 {
        return Err(ConfigError::Validation(
            "wave_deadline_secs must be >= 1".to_string(),
        ));
    }

    if config.link_marker.is_empty() {
        return Err(ConfigError::Validation(
            "link_marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Checks that every extractor selector compiles
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    for (field, selector) in [
        ("headline-selector", &config.headline_selector),
        ("time-selector", &config.time_selector),
        ("body-selector", &config.body_selector),
        ("caption-selector", &config.caption_selector),
        ("noise-selector", &config.noise_selector),
    ] {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                field,
                selector: selector.clone(),
            });
        }
    }
    Ok(())
}

/// Validates the storage backend selection
fn validate_storage_target(target: &StorageTarget) -> Result<(), ConfigError> {
    match target {
        StorageTarget::Local { root } => {
            if root.trim().is_empty() {
                return Err(ConfigError::MissingRequiredField("storage.root".to_string()));
            }
            Ok(())
        }
        StorageTarget::Remote(remote) => validate_remote_storage(remote),
    }
}

fn validate_remote_storage(config: &RemoteStorageConfig) -> Result<(), ConfigError> {
    if config.bucket.is_empty() {
        return Err(ConfigError::MissingRequiredField("storage.bucket".to_string()));
    }

    if config.region.is_empty() {
        return Err(ConfigError::MissingRequiredField("storage.region".to_string()));
    }

    if config.access_key_id.is_none() {
        return Err(ConfigError::MissingRequiredField(
            "storage.access-key-id (or AWS_ACCESS_KEY_ID)".to_string(),
        ));
    }

    if config.secret_access_key.is_none() {
        return Err(ConfigError::MissingRequiredField(
            "storage.secret-access-key (or AWS_SECRET_ACCESS_KEY)".to_string(),
        ));
    }

    for (field, value) in [
        ("endpoint", &config.endpoint),
        ("public-base-url", &config.public_base_url),
    ] {
        if let Some(value) = value {
            Url::parse(value).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid storage.{} '{}': {}", field, value, e))
            })?;
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
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
