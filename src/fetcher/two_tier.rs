use super::{
    ContentFetcher, CrawlResult, FallbackPolicy, FetchError, FetchStrategy, PageRenderer,
    StaticFetcher, TextExtractor,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Static fetch first, rendering when the policy asks for it
///
/// # Flow
///
/// 1. Dynamic domains are rendered directly
/// 2. Everything else gets a static GET
/// 3. Static failures that escalate (non-2xx, timeout, network, too short)
///    are retried by rendering
/// 4. If rendering fails too, the error names both causes
pub struct TwoTierFetcher {
    static_fetcher: StaticFetcher,
    renderer: Option<Arc<dyn PageRenderer>>,
    extractor: Arc<TextExtractor>,
    policy: FallbackPolicy,
}

impl TwoTierFetcher {
    pub fn new(
        static_fetcher: StaticFetcher,
        renderer: Option<Arc<dyn PageRenderer>>,
        extractor: Arc<TextExtractor>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            static_fetcher,
            renderer,
            extractor,
            policy,
        }
    }

    async fn render(&self, url: &str) -> Result<CrawlResult, FetchError> {
        let renderer = self
            .renderer
            .as_ref()
            .ok_or_else(|| FetchError::Render("rendering is disabled".to_string()))?;
        let html = renderer.render(url).await?;
        let page = self.extractor.extract(url, &html);
        self.policy
            .check_rendered(CrawlResult::new(url, page, FetchStrategy::Rendered, None))
    }

    fn can_render(&self) -> bool {
        self.renderer.is_some() && self.policy.render_enabled()
    }
}

#[async_trait]
impl ContentFetcher for TwoTierFetcher {
    async fn fetch(&self, url: &str) -> Result<CrawlResult, FetchError> {
        if self.can_render() && self.policy.initial_strategy(url) == FetchStrategy::Rendered {
            tracing::debug!("Rendering {} (dynamic domain)", url);
            return self.render(url).await;
        }

        let static_error = match self
            .static_fetcher
            .fetch(url)
            .await
            .and_then(|result| self.policy.check_static(result))
        {
            Ok(result) => return Ok(result),
            Err(e) if self.can_render() && self.policy.should_escalate(&e) => e,
            Err(e) => return Err(e),
        };

        tracing::debug!("Static fetch of {} failed ({}), rendering", url, static_error);
        self.render(url)
            .await
            .map_err(|render_error| FetchError::BothStrategiesFailed {
                static_error: static_error.to_string(),
                render_error: render_error.to_string(),
            })
    }
}
