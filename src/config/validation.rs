use crate::config::types::{
    Config, CrawlerConfig, FetcherConfig, InputConfig, OutputConfig, SummaryConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
///
/// The summary section is only checked when summaries are enabled; a
/// `--no-summary` run must not fail because no API key is set.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_input_config(&config.input)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    if config.crawler.generate_summary {
        validate_summary_config(&config.summary)?;
    }
    Ok(())
}

fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.bookmarks_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "bookmarks-path cannot be empty".to_string(),
        ));
    }

    for pattern in &config.exclude_domains {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

/// Validates worker pool configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 256 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 256, got {}",
            config.max_workers
        )));
    }

    if config.workers < 1 || config.workers > config.max_workers {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {} (max-workers), got {}",
            config.max_workers, config.workers
        )));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress-interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates content fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.static_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "static fetch timeouts must be >= 1 second".to_string(),
        ));
    }

    if config.render_enabled && config.render_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "render-timeout-secs must be >= 1 second".to_string(),
        ));
    }

    for pattern in &config.dynamic_domains {
        validate_domain_pattern(pattern)?;
    }

    for rule in &config.extract_rules {
        validate_domain_pattern(&rule.domain)?;

        if rule.selectors.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Extract rule for '{}' must have at least one selector",
                rule.domain
            )));
        }

        for selector in &rule.selectors {
            Selector::parse(selector).map_err(|_| {
                ConfigError::InvalidPattern(format!(
                    "Invalid CSS selector '{}' for '{}'",
                    selector, rule.domain
                ))
            })?;
        }
    }

    Ok(())
}

/// Validates summarization backend configuration
pub fn validate_summary_config(config: &SummaryConfig) -> Result<(), ConfigError> {
    if config.model_type.requires_api_key() && config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingApiKey(config.model_type.to_string()));
    }

    if config.model_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "model-name cannot be empty".to_string(),
        ));
    }

    let endpoint = Url::parse(config.endpoint())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-base: {}", e)))?;
    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "api-base must use http or https, got '{}'",
            endpoint.scheme()
        )));
    }

    if config.max_tokens < 1 {
        return Err(ConfigError::Validation(
            "max-tokens must be >= 1".to_string(),
        ));
    }

    if config.max_input_length < 1 {
        return Err(ConfigError::Validation(
            "max-input-length must be >= 1".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.retry.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "retry.max-attempts must be >= 1".to_string(),
        ));
    }

    if config.retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "retry.backoff-multiplier must be >= 1.0, got {}",
            config.retry.backoff_multiplier
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("database-path", &config.database_path),
        ("bookmarks-json", &config.bookmarks_json),
        ("dataset-json", &config.dataset_json),
        ("failures-json", &config.failures_json),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
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

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
