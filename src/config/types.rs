use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Main configuration structure for Bookmark Harvest
///
/// Every section is optional in the TOML file; missing values fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub crawler: CrawlerConfig,
    pub fetcher: FetcherConfig,
    pub summary: SummaryConfig,
    pub output: OutputConfig,
}

/// Where bookmarks come from and which of them are candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Path to the bookmark export (`~` is expanded)
    #[serde(rename = "bookmarks-path")]
    pub bookmarks_path: String,

    /// Format of the bookmark export
    pub format: BookmarkFormat,

    /// Only process the first N candidates (0 = no limit)
    pub limit: usize,

    /// URL prefixes that are never crawled (e.g. private network ranges)
    #[serde(rename = "exclude-prefixes")]
    pub exclude_prefixes: Vec<String>,

    /// Domain patterns that are never crawled (supports `*.example.com`)
    #[serde(rename = "exclude-domains")]
    pub exclude_domains: Vec<String>,

    /// Bookmark titles that are never crawled (e.g. browser-internal entries)
    #[serde(rename = "exclude-titles")]
    pub exclude_titles: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            bookmarks_path: "~/Library/Application Support/Google/Chrome/Default/Bookmarks"
                .to_string(),
            format: BookmarkFormat::Chrome,
            limit: 0,
            exclude_prefixes: vec!["http://10.0.".to_string(), "https://10.0.".to_string()],
            exclude_domains: Vec::new(),
            exclude_titles: Vec::new(),
        }
    }
}

/// Supported bookmark export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkFormat {
    /// Chrome/Chromium `Bookmarks` JSON file
    Chrome,
    /// A JSON array of bookmark records (e.g. a previously written `bookmarks.json`)
    List,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Default number of concurrent workers
    pub workers: usize,

    /// Upper bound for the worker count, whatever the CLI asks for
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Whether summaries are generated after fetching
    #[serde(rename = "generate-summary")]
    pub generate_summary: bool,

    /// Log progress every N finished URLs
    #[serde(rename = "progress-interval")]
    pub progress_interval: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            max_workers: 64,
            generate_summary: true,
            progress_interval: 10,
        }
    }
}

impl CrawlerConfig {
    /// Clamps a requested worker count to `[1, max-workers]`, warning when it changes
    pub fn clamp_workers(&self, requested: usize) -> usize {
        let clamped = requested.clamp(1, self.max_workers.max(1));
        if clamped != requested {
            tracing::warn!(
                "Requested {} workers, using {} (max-workers is {})",
                requested,
                clamped,
                self.max_workers
            );
        }
        clamped
    }
}

/// Content fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// User agent sent by the static fetcher and the headless browser
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total timeout of a static fetch (seconds)
    #[serde(rename = "static-timeout-secs")]
    pub static_timeout_secs: u64,

    /// Connect timeout of a static fetch (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Static results with fewer characters than this are re-fetched by rendering
    /// (0 disables the length rule)
    #[serde(rename = "min-content-length")]
    pub min_content_length: usize,

    /// Whether the rendering fallback is available at all
    #[serde(rename = "render-enabled")]
    pub render_enabled: bool,

    /// Domains that always go straight to rendering (empty disables the domain rule)
    #[serde(rename = "dynamic-domains")]
    pub dynamic_domains: Vec<String>,

    /// Total timeout of a rendering fetch (seconds)
    #[serde(rename = "render-timeout-secs")]
    pub render_timeout_secs: u64,

    /// Time to let client-side scripts settle after the load event (milliseconds)
    #[serde(rename = "render-settle-ms")]
    pub render_settle_ms: u64,

    /// Explicit Chrome/Chromium binary (auto-detected when absent)
    #[serde(rename = "chrome-executable")]
    pub chrome_executable: Option<String>,

    /// Per-domain content selectors
    #[serde(rename = "extract-rules")]
    pub extract_rules: Vec<ExtractRule>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            static_timeout_secs: 15,
            connect_timeout_secs: 10,
            min_content_length: 5,
            render_enabled: true,
            dynamic_domains: vec!["*.zhihu.com".to_string()],
            render_timeout_secs: 30,
            render_settle_ms: 2000,
            chrome_executable: None,
            extract_rules: vec![ExtractRule {
                domain: "*.zhihu.com".to_string(),
                selectors: vec![
                    ".Post-RichText".to_string(),
                    ".RichText".to_string(),
                    "article".to_string(),
                ],
            }],
        }
    }
}

/// CSS selectors tried in order when extracting text from pages of one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRule {
    /// Domain pattern (e.g., "example.com" or "*.example.com")
    pub domain: String,

    /// Selectors tried in order; the first match wins
    pub selectors: Vec<String>,
}

/// Summarization backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Which backend adapter to use
    #[serde(rename = "model-type")]
    pub model_type: ModelType,

    /// Bearer token for the backend
    #[serde(rename = "api-key")]
    pub api_key: String,

    /// Backend base URL (empty selects the model type's default)
    #[serde(rename = "api-base")]
    pub api_base: String,

    /// Model identifier passed to the backend
    #[serde(rename = "model-name")]
    pub model_name: String,

    /// Maximum number of generated tokens
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Content longer than this many characters is head-truncated
    #[serde(rename = "max-input-length")]
    pub max_input_length: usize,

    #[serde(rename = "top-p")]
    pub top_p: f32,

    #[serde(rename = "top-k")]
    pub top_k: u32,

    #[serde(rename = "frequency-penalty")]
    pub frequency_penalty: f32,

    /// Replaces the built-in summarization instructions
    #[serde(rename = "system-prompt")]
    pub system_prompt: Option<String>,

    /// Timeout of one backend request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Send a tiny request before the run and abort if the backend is unusable
    #[serde(rename = "probe-on-start")]
    pub probe_on_start: bool,

    pub retry: RetryConfig,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::OpenAi,
            api_key: String::new(),
            api_base: String::new(),
            model_name: "gpt-3.5-turbo".to_string(),
            max_tokens: 1000,
            temperature: 0.3,
            max_input_length: 6000,
            top_p: 0.7,
            top_k: 50,
            frequency_penalty: 0.5,
            system_prompt: None,
            request_timeout_secs: 60,
            probe_on_start: true,
            retry: RetryConfig::default(),
        }
    }
}

impl SummaryConfig {
    /// Returns the configured base URL, or the model type's default one
    pub fn endpoint(&self) -> &str {
        let base = self.api_base.trim();
        if base.is_empty() {
            self.model_type.default_api_base()
        } else {
            base.trim_end_matches('/')
        }
    }
}

/// Retry behaviour for backend calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "initial-delay-ms")]
    pub initial_delay_ms: u64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    #[serde(rename = "backoff-multiplier")]
    pub backoff_multiplier: f64,

    /// Randomize each delay by up to ±25%
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Backend families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "qwen")]
    Qwen,
    #[serde(rename = "ollama")]
    Ollama,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Qwen => "qwen",
            Self::Ollama => "ollama",
        }
    }

    /// Hosted backends refuse anonymous requests; Qwen and Ollama are commonly self-hosted
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAi | Self::DeepSeek)
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::DeepSeek => "https://api.deepseek.com/v1",
            Self::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

impl FromStr for ModelType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            "qwen" => Ok(Self::Qwen),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnknownModelType(other.to_string())),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite checkpoint database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// JSON array of filtered candidate bookmarks
    #[serde(rename = "bookmarks-json")]
    pub bookmarks_json: String,

    /// JSON array of fetched content and summaries
    #[serde(rename = "dataset-json")]
    pub dataset_json: String,

    /// JSON array of failure records
    #[serde(rename = "failures-json")]
    pub failures_json: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./bookmarks.db".to_string(),
            bookmarks_json: "./bookmarks.json".to_string(),
            dataset_json: "./bookmarks_with_content.json".to_string(),
            failures_json: "./failed_urls.json".to_string(),
        }
    }
}
