//! Summarization through real backend adapters against a mock API

use crate::common::summary_config;
use bookmark_harvest::config::{ModelType, SummaryConfig};
use bookmark_harvest::fetcher::{CrawlResult, ExtractedPage, FetchStrategy};
use bookmark_harvest::summarizer::{BackendErrorKind, SummaryError};
use bookmark_harvest::{BookmarkRecord, Summarizer};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    }))
}

fn openai_config(server: &MockServer) -> SummaryConfig {
    SummaryConfig {
        model_type: ModelType::OpenAi,
        api_key: "test-key".to_string(),
        api_base: server.uri(),
        ..summary_config()
    }
}

fn page(text: &str) -> (BookmarkRecord, CrawlResult) {
    let bookmark = BookmarkRecord::new("https://example.com/post", "A Post");
    let crawl = CrawlResult::new(
        &bookmark.url,
        ExtractedPage {
            title: None,
            text: text.to_string(),
        },
        FetchStrategy::Static,
        Some(200),
    );
    (bookmark, crawl)
}

/// The user message of every chat request the server received
async fn submitted_texts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            let body: Value = request.body_json().unwrap();
            body["messages"][1]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_oversized_input_is_cut_to_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(chat_reply("A short summary."))
        .mount(&server)
        .await;

    let config = SummaryConfig {
        max_input_length: 10,
        ..openai_config(&server)
    };
    let summarizer = Summarizer::from_config(&config).unwrap();

    let (bookmark, at_limit) = page("0123456789");
    summarizer.summarize(&bookmark, &at_limit).await.unwrap();
    let (_, over_limit) = page("0123456789abcdefghijklmno");
    let record = summarizer.summarize(&bookmark, &over_limit).await.unwrap();

    assert_eq!(submitted_texts(&server).await, vec!["0123456789"; 2]);
    assert_eq!(record.summary_text, "A short summary.");
    assert_eq!(record.model_used, "mock-model");
    assert_eq!(record.input_token_estimate, 3);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(chat_reply("Recovered summary."))
        .mount(&server)
        .await;

    let summarizer = Summarizer::from_config(&openai_config(&server)).unwrap();
    let (bookmark, crawl) = page("Some page text");
    let record = summarizer.summarize(&bookmark, &crawl).await.unwrap();

    assert_eq!(record.summary_text, "Recovered summary.");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_report_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let summarizer = Summarizer::from_config(&openai_config(&server)).unwrap();
    let (bookmark, crawl) = page("Some page text");
    let err = summarizer.summarize(&bookmark, &crawl).await.unwrap_err();

    assert!(matches!(
        err,
        SummaryError::Backend {
            kind: BackendErrorKind::Transient,
            attempts: 3,
            ..
        }
    ));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let summarizer = Summarizer::from_config(&openai_config(&server)).unwrap();
    let (bookmark, crawl) = page("Some page text");
    let err = summarizer.summarize(&bookmark, &crawl).await.unwrap_err();

    assert_eq!(err.attempts(), 1);
    assert!(matches!(
        err,
        SummaryError::Backend {
            kind: BackendErrorKind::Auth,
            ..
        }
    ));
    assert!(summarizer.probe().await.is_err());
}

#[tokio::test]
async fn test_blank_reply_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(chat_reply("   \n"))
        .mount(&server)
        .await;

    let summarizer = Summarizer::from_config(&openai_config(&server)).unwrap();
    let (bookmark, crawl) = page("Some page text");
    let err = summarizer.summarize(&bookmark, &crawl).await.unwrap_err();

    assert!(matches!(err, SummaryError::Empty { attempts: 1 }));
}

#[tokio::test]
async fn test_ollama_backend_needs_no_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "mock-model",
            "message": { "role": "assistant", "content": "Local summary." },
            "done": true
        })))
        .mount(&server)
        .await;

    let config = SummaryConfig {
        model_type: ModelType::Ollama,
        api_key: String::new(),
        api_base: server.uri(),
        ..summary_config()
    };
    let summarizer = Summarizer::from_config(&config).unwrap();
    let (bookmark, crawl) = page("Some page text");
    let record = summarizer.summarize(&bookmark, &crawl).await.unwrap();

    assert_eq!(record.summary_text, "Local summary.");
}

#[test]
fn test_remote_backend_requires_key() {
    let config = SummaryConfig {
        model_type: ModelType::DeepSeek,
        api_key: String::new(),
        ..summary_config()
    };
    assert!(Summarizer::from_config(&config).is_err());
}
