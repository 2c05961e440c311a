//! Two-tier fetching against a mock HTTP server

use async_trait::async_trait;
use bookmark_harvest::config::FetcherConfig;
use bookmark_harvest::fetcher::{
    build_http_client, ContentFetcher, FallbackPolicy, FetchError, FetchStrategy, PageRenderer,
    StaticFetcher, TextExtractor, TwoTierFetcher,
};
use bookmark_harvest::url::DomainSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renderer returning canned HTML, or failing when there is none
struct MockRenderer {
    html: Option<&'static str>,
    calls: AtomicUsize,
}

impl MockRenderer {
    fn returning(html: &'static str) -> Arc<Self> {
        Arc::new(Self {
            html: Some(html),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            html: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.html
            .map(str::to_string)
            .ok_or_else(|| FetchError::Render("Chrome exited".to_string()))
    }
}

fn two_tier(renderer: &Arc<MockRenderer>, min_content_length: usize) -> TwoTierFetcher {
    let config = FetcherConfig {
        static_timeout_secs: 5,
        ..FetcherConfig::default()
    };
    let extractor = Arc::new(TextExtractor::new(&[]));
    let client = build_http_client(&config).unwrap();
    TwoTierFetcher::new(
        StaticFetcher::new(client, Arc::clone(&extractor)),
        Some(Arc::clone(renderer) as Arc<dyn PageRenderer>),
        extractor,
        FallbackPolicy::new(DomainSet::default(), min_content_length, true),
    )
}

async fn serve(server: &MockServer, route: &str, status: u16, body: &str, mime: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_raw(body.to_string(), mime))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_long_static_page_is_not_rendered() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/article",
        200,
        "<html><head><title>Article</title></head><body><p>A long enough paragraph.</p></body></html>",
        "text/html",
    )
    .await;

    let renderer = MockRenderer::failing();
    let result = two_tier(&renderer, 5)
        .fetch(&format!("{}/article", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.strategy_used, FetchStrategy::Static);
    assert_eq!(result.http_status, Some(200));
    assert_eq!(result.page_title.as_deref(), Some("Article"));
    assert!(result.raw_content.contains("A long enough paragraph."));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn test_short_static_page_falls_back_to_rendering() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/app",
        200,
        "<html><body>abc</body></html>",
        "text/html",
    )
    .await;

    let renderer =
        MockRenderer::returning("<html><body><p>Content rendered by scripts</p></body></html>");
    let result = two_tier(&renderer, 5)
        .fetch(&format!("{}/app", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.strategy_used, FetchStrategy::Rendered);
    assert_eq!(result.http_status, None);
    assert_eq!(result.raw_content, "Content rendered by scripts");
    assert_eq!(result.content_length, result.raw_content.chars().count());
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn test_error_status_with_failed_rendering_names_both_causes() {
    let server = MockServer::start().await;
    serve(&server, "/gone", 404, "not found", "text/html").await;

    let renderer = MockRenderer::failing();
    let err = two_tier(&renderer, 5)
        .fetch(&format!("{}/gone", server.uri()))
        .await
        .unwrap_err();

    match err {
        FetchError::BothStrategiesFailed {
            static_error,
            render_error,
        } => {
            assert!(static_error.contains("404"), "{}", static_error);
            assert!(render_error.contains("Chrome exited"), "{}", render_error);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn test_binary_content_is_not_rendered() {
    let server = MockServer::start().await;
    serve(&server, "/paper.pdf", 200, "%PDF-1.7", "application/pdf").await;

    let renderer = MockRenderer::returning("<html><body>never used</body></html>");
    let err = two_tier(&renderer, 5)
        .fetch(&format!("{}/paper.pdf", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::UnsupportedContent { .. }));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn test_length_rule_disabled_keeps_short_pages() {
    let server = MockServer::start().await;
    serve(&server, "/tiny", 200, "<html><body>ok</body></html>", "text/html").await;

    let renderer = MockRenderer::failing();
    let result = two_tier(&renderer, 0)
        .fetch(&format!("{}/tiny", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.strategy_used, FetchStrategy::Static);
    assert_eq!(result.raw_content, "ok");
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn test_refetching_unchanged_page_yields_identical_content() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/stable",
        200,
        "<html><body><nav>Menu</nav><p>  First line  </p>\n\n<p>Second line</p><script>x()</script></body></html>",
        "text/html",
    )
    .await;

    let renderer = MockRenderer::failing();
    let fetcher = two_tier(&renderer, 5);
    let url = format!("{}/stable", server.uri());
    let first = fetcher.fetch(&url).await.unwrap();
    let second = fetcher.fetch(&url).await.unwrap();

    assert_eq!(first.raw_content, second.raw_content);
    assert!(!first.raw_content.contains("Menu"));
    assert!(!first.raw_content.contains("x()"));
    assert!(first.raw_content.contains("First line"));
}

#[tokio::test]
async fn test_meta_declared_gbk_page_is_decoded() {
    let server = MockServer::start().await;
    let mut body = b"<html><head><meta charset=\"gbk\"><title>t</title></head><body><p>".to_vec();
    body.extend([0xD6u8, 0xD0, 0xCE, 0xC4].repeat(5));
    body.extend(b"</p></body></html>");
    Mock::given(method("GET"))
        .and(path("/gbk"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(&server)
        .await;

    let renderer = MockRenderer::failing();
    let result = two_tier(&renderer, 5)
        .fetch(&format!("{}/gbk", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.strategy_used, FetchStrategy::Static);
    assert!(result.raw_content.contains("中文中文中文中文中文"), "{}", result.raw_content);
    assert!(!result.raw_content.contains('\u{FFFD}'));
    assert_eq!(renderer.calls(), 0);
}
