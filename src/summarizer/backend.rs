//! The capability every summarization backend provides

use super::retry::IsRetryable;
use crate::config::SummaryConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// One request to a backend
///
/// `text` is the (already truncated) page content; `instructions` frame it and
/// are sent separately, as the system message of a chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub instructions: String,
    pub text: String,
}

/// Sampling parameters shared by all backends
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub frequency_penalty: f32,
}

impl From<&SummaryConfig> for GenerationParams {
    fn from(config: &SummaryConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            frequency_penalty: config.frequency_penalty,
        }
    }
}

/// Coarse failure classes; only the first two are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// 5xx, timeouts, dropped connections
    Transient,
    /// HTTP 429
    RateLimited,
    /// HTTP 401/403
    Auth,
    /// Other 4xx
    Rejected,
    /// The response could not be understood
    Malformed,
}

impl BackendErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::RateLimited => "rate_limited",
            Self::Auth => "auth",
            Self::Rejected => "rejected",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed backend call
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classifies a non-success HTTP response
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let kind = match status.as_u16() {
            429 => BackendErrorKind::RateLimited,
            401 | 403 => BackendErrorKind::Auth,
            408 => BackendErrorKind::Transient,
            s if s >= 500 => BackendErrorKind::Transient,
            _ => BackendErrorKind::Rejected,
        };
        let snippet: String = body.chars().take(200).collect();
        Self::new(kind, format!("HTTP {}: {}", status.as_u16(), snippet.trim()))
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Malformed, message)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_decode() {
            BackendErrorKind::Malformed
        } else {
            BackendErrorKind::Transient
        };
        Self::new(kind, e.to_string())
    }
}

impl IsRetryable for BackendError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            BackendErrorKind::Transient | BackendErrorKind::RateLimited
        )
    }
}

/// A text-generation API
///
/// Implementations translate [`SubmitRequest`] into their wire protocol and
/// return the generated text. They hold no per-URL state.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Model identifier recorded on every summary
    fn model_name(&self) -> &str;

    async fn submit(
        &self,
        request: &SubmitRequest,
        params: &GenerationParams,
    ) -> Result<String, BackendError>;
}
