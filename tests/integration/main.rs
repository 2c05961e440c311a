//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to stand in for web pages and summarization APIs,
//! and temporary SQLite databases for the checkpoint store.

mod common;
mod fetcher_tests;
mod pipeline_tests;
mod summarizer_tests;
