//! Summarization client
//!
//! [`Summarizer`] turns fetched content into a [`SummaryRecord`]. It truncates
//! oversized input, frames it with instructions and hands it to a pluggable
//! [`SummaryBackend`], retrying transient failures with a [`RetryPolicy`].

mod backend;
mod ollama;
mod openai;
mod prompt;
mod retry;

pub use backend::{
    BackendError, BackendErrorKind, GenerationParams, SubmitRequest, SummaryBackend,
};
pub use ollama::OllamaBackend;
pub use openai::ChatCompletionsBackend;
pub use prompt::{build_instructions, estimate_tokens, truncate_input, DEFAULT_INSTRUCTIONS};
pub use retry::{with_retry, IsRetryable, RetryOutcome, RetryPolicy};

use crate::bookmarks::BookmarkRecord;
use crate::config::{ModelType, SummaryConfig};
use crate::fetcher::CrawlResult;
use crate::ConfigError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Prompt sent by [`Summarizer::probe`]
const PROBE_TEXT: &str = "Reply with one short sentence saying who you are.";

/// A generated summary of one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub url: String,
    pub summary_text: String,
    pub model_used: String,
    pub input_token_estimate: u32,
    pub generated_at: DateTime<Utc>,
}

/// Why no summary was produced
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("{kind} backend error after {attempts} attempt(s): {message}")]
    Backend {
        kind: BackendErrorKind,
        message: String,
        attempts: u32,
    },

    #[error("Backend returned an empty summary")]
    Empty { attempts: u32 },
}

impl SummaryError {
    /// Number of backend calls made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Backend { attempts, .. } | Self::Empty { attempts } => *attempts,
        }
    }
}

/// Summarizes fetched pages through one backend
pub struct Summarizer {
    backend: Box<dyn SummaryBackend>,
    params: GenerationParams,
    max_input_length: usize,
    instructions: String,
    retry: RetryPolicy,
}

impl Summarizer {
    pub fn new(backend: Box<dyn SummaryBackend>, config: &SummaryConfig) -> Self {
        Self {
            backend,
            params: GenerationParams::from(config),
            max_input_length: config.max_input_length,
            instructions: config
                .system_prompt
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            retry: RetryPolicy::from(&config.retry),
        }
    }

    /// Builds the summarizer for the configured backend
    pub fn from_config(config: &SummaryConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(build_backend(config)?, config))
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Summarizes the content fetched for `bookmark`
    ///
    /// Content longer than `max_input_length` characters is cut to exactly that
    /// many characters before it is submitted.
    pub async fn summarize(
        &self,
        bookmark: &BookmarkRecord,
        content: &CrawlResult,
    ) -> Result<SummaryRecord, SummaryError> {
        let text = truncate_input(&content.raw_content, self.max_input_length);
        if text.len() < content.raw_content.len() {
            tracing::debug!(
                "Truncated content of {} from {} to {} characters",
                bookmark.url,
                content.content_length,
                self.max_input_length
            );
        }

        let title = if bookmark.title.trim().is_empty() {
            content.page_title.as_deref().unwrap_or_default()
        } else {
            bookmark.title.as_str()
        };
        let request = SubmitRequest {
            instructions: build_instructions(&self.instructions, title, &bookmark.url),
            text: text.to_string(),
        };

        let outcome = with_retry(&self.retry, || self.backend.submit(&request, &self.params)).await;
        let attempts = outcome.attempts;
        let summary = outcome.result.map_err(|e| SummaryError::Backend {
            kind: e.kind,
            message: e.message,
            attempts,
        })?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(SummaryError::Empty { attempts });
        }

        Ok(SummaryRecord {
            url: bookmark.url.clone(),
            summary_text: summary.to_string(),
            model_used: self.backend.model_name().to_string(),
            input_token_estimate: estimate_tokens(text),
            generated_at: Utc::now(),
        })
    }

    /// Sends a tiny request to check the backend is reachable and authorized
    pub async fn probe(&self) -> Result<(), ConfigError> {
        let request = SubmitRequest {
            instructions: String::new(),
            text: PROBE_TEXT.to_string(),
        };
        let params = GenerationParams {
            max_tokens: 32,
            ..self.params.clone()
        };

        let reply = self
            .backend
            .submit(&request, &params)
            .await
            .map_err(|e| ConfigError::BackendProbe(e.to_string()))?;
        tracing::info!(
            "Summarization backend '{}' answered: {}",
            self.backend.model_name(),
            reply.trim().chars().take(80).collect::<String>()
        );
        Ok(())
    }
}

/// Selects the backend adapter for the configured model type
pub fn build_backend(config: &SummaryConfig) -> Result<Box<dyn SummaryBackend>, ConfigError> {
    if config.model_type.requires_api_key() && config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingApiKey(config.model_type.to_string()));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

    tracing::info!(
        "Using {} backend at {} (model {})",
        config.model_type,
        config.endpoint(),
        config.model_name
    );

    let backend: Box<dyn SummaryBackend> = match config.model_type {
        ModelType::Ollama => Box::new(OllamaBackend::new(client, config)),
        ModelType::OpenAi | ModelType::DeepSeek | ModelType::Qwen => {
            Box::new(ChatCompletionsBackend::new(client, config))
        }
    };
    Ok(backend)
}
