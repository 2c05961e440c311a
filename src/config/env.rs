//! Environment variable overrides
//!
//! The variable names are the ones users of the tool already have in their
//! `.env` files, so they are kept flat rather than namespaced.

use crate::config::types::{Config, ModelType};
use crate::ConfigError;
use std::str::FromStr;

/// Applies environment overrides to a configuration
///
/// `lookup` returns the value of a variable, or `None` if it is unset. Empty
/// values are treated as unset.
///
/// | Variable | Field |
/// |----------|-------|
/// | `MODEL_TYPE` | `summary.model-type` |
/// | `API_KEY` | `summary.api-key` |
/// | `API_BASE` | `summary.api-base` |
/// | `MODEL_NAME` | `summary.model-name` |
/// | `MAX_TOKENS` | `summary.max-tokens` |
/// | `MAX_INPUT_CONTENT_LENGTH` | `summary.max-input-length` |
/// | `TEMPERATURE` | `summary.temperature` |
/// | `TOP_P` / `TOP_K` / `FREQUENCY_PENALTY` | sampling extras |
/// | `SYSTEM_PROMPT` | `summary.system-prompt` |
/// | `BOOKMARK_LIMIT` | `input.limit` |
/// | `MAX_WORKERS` | `crawler.workers`, clamped to `max-workers` |
/// | `GENERATE_SUMMARY` | `crawler.generate-summary` |
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("MODEL_TYPE") {
        config.summary.model_type = ModelType::from_str(&v)?;
    }
    if let Some(v) = get("API_KEY") {
        config.summary.api_key = v;
    }
    if let Some(v) = get("API_BASE") {
        config.summary.api_base = v;
    }
    if let Some(v) = get("MODEL_NAME") {
        config.summary.model_name = v;
    }
    if let Some(v) = get("MAX_TOKENS") {
        config.summary.max_tokens = parse_var("MAX_TOKENS", &v)?;
    }
    if let Some(v) = get("MAX_INPUT_CONTENT_LENGTH") {
        config.summary.max_input_length = parse_var("MAX_INPUT_CONTENT_LENGTH", &v)?;
    }
    if let Some(v) = get("TEMPERATURE") {
        config.summary.temperature = parse_var("TEMPERATURE", &v)?;
    }
    if let Some(v) = get("TOP_P") {
        config.summary.top_p = parse_var("TOP_P", &v)?;
    }
    if let Some(v) = get("TOP_K") {
        config.summary.top_k = parse_var("TOP_K", &v)?;
    }
    if let Some(v) = get("FREQUENCY_PENALTY") {
        config.summary.frequency_penalty = parse_var("FREQUENCY_PENALTY", &v)?;
    }
    if let Some(v) = get("SYSTEM_PROMPT") {
        config.summary.system_prompt = Some(v);
    }
    if let Some(v) = get("BOOKMARK_LIMIT") {
        config.input.limit = parse_var("BOOKMARK_LIMIT", &v)?;
    }
    if let Some(v) = get("MAX_WORKERS") {
        let requested = parse_var("MAX_WORKERS", &v)?;
        config.crawler.workers = config.crawler.clamp_workers(requested);
    }
    if let Some(v) = get("GENERATE_SUMMARY") {
        config.crawler.generate_summary = parse_bool("GENERATE_SUMMARY", &v)?;
    }

    Ok(())
}

/// Applies overrides from the process environment
pub fn apply_process_env(config: &mut Config) -> Result<(), ConfigError> {
    apply_env_overrides(config, |name| std::env::var(name).ok())
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
