use crate::config::types::{Config, CrawlerConfig, SearchConfig, StorageConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Largest depth accepted from configuration
pub const MAX_CONFIG_DEPTH: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_search_config(&config.search)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth > MAX_CONFIG_DEPTH {
        return Err(ConfigError::Validation(format!(
            "max_depth must be at most {}, got {}",
            MAX_CONFIG_DEPTH, config.max_depth
        )));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.fetch_timeout_ms < 100 || config.fetch_timeout_ms > 120_000 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_ms must be between 100 and 120000, got {}ms",
            config.fetch_timeout_ms
        )));
    }

    if config.recrawl_interval_secs != 0 && config.recrawl_interval_secs < 60 {
        return Err(ConfigError::Validation(format!(
            "recrawl_interval_secs must be 0 or >= 60, got {}",
            config.recrawl_interval_secs
        )));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    Ok(())
}

/// Validates a seed URL: must parse and use http or https
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
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

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.default_page_size < 1 || config.default_page_size > 50 {
        return Err(ConfigError::Validation(format!(
            "default_page_size must be between 1 and 50, got {}",
            config.default_page_size
        )));
    }

    if config.snippet_radius < 10 || config.snippet_radius > 1000 {
        return Err(ConfigError::Validation(format!(
            "snippet_radius must be between 10 and 1000, got {}",
            config.snippet_radius
        )));
    }

    Ok(())
}
