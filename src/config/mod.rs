//! Configuration module for Bookmark Harvest
//!
//! Configuration is layered: an optional TOML file, then environment variables
//! (a `.env` file is honoured by the binary), then command-line flags. The
//! result is one immutable [`Config`] passed into every constructor.
//!
//! # Example
//!
//! ```no_run
//! use bookmark_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Workers: {}", config.crawler.workers);
//! ```

mod env;
mod parser;
mod types;
mod validation;

pub use types::{
    BookmarkFormat, Config, CrawlerConfig, ExtractRule, FetcherConfig, InputConfig, ModelType,
    OutputConfig, RetryConfig, SummaryConfig,
};

pub use env::{apply_env_overrides, apply_process_env};
pub use parser::{compute_config_hash, expand_home, load_config, load_layered_config};
pub use validation::{validate, validate_summary_config};
