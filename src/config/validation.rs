use crate::config::types::{ClonerConfig, Config, HttpConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_cloner_config(&config.cloner)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates clone traversal configuration
fn validate_cloner_config(config: &ClonerConfig) -> Result<(), ConfigError> {
    let target = Url::parse(&config.target)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target '{}': {}", config.target, e)))?;

    if target.scheme() != "http" && target.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Target '{}' must use the http or https scheme",
            config.target
        )));
    }

    if target.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Target '{}' has no host",
            config.target
        )));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

/// Validates HTTP limits
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.page_timeout == 0 {
        return Err(ConfigError::Validation(
            "page_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.connect_timeout == 0 || config.connect_timeout > config.page_timeout {
        return Err(ConfigError::Validation(format!(
            "connect_timeout must be between 1 and page_timeout ({}s), got {}s",
            config.page_timeout, config.connect_timeout
        )));
    }

    if config.max_page_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_page_bytes must be >= 1024, got {}",
            config.max_page_bytes
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.target_dir.is_empty() {
        return Err(ConfigError::Validation(
            "target_dir cannot be empty".to_string(),
        ));
    }

    if config.manifest_path.is_empty() {
        return Err(ConfigError::Validation(
            "manifest_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
