//! Headless browser rendering
//!
//! One Chromium process is launched on first use and shared by every worker.
//! Each render gets its own tab, which is closed afterwards even when the
//! render times out. A browser whose connection died is relaunched on the
//! next render.

use super::FetchError;
use crate::config::FetcherConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Produces the post-script HTML of a page
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, FetchError>;
}

/// A launched resource plus a flag cleared once its connection ends
struct Live<T> {
    value: Arc<T>,
    alive: Arc<AtomicBool>,
}

/// Lazily launched shared resource, relaunched after it dies
struct LiveSlot<T> {
    slot: Mutex<Option<Live<T>>>,
}

impl<T> LiveSlot<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Returns the current value, launching a new one if there is none or it died
    async fn get_or_launch<F, Fut>(&self, launch: F) -> Result<Arc<T>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(T, Arc<AtomicBool>), FetchError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(live) = slot.as_ref() {
            if live.alive.load(Ordering::SeqCst) {
                return Ok(Arc::clone(&live.value));
            }
            tracing::warn!("Headless browser connection lost, relaunching");
        }

        let (value, alive) = launch().await?;
        let value = Arc::new(value);
        *slot = Some(Live {
            value: Arc::clone(&value),
            alive,
        });
        Ok(value)
    }

    /// Drops the current value so the next call relaunches
    async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}

/// Runs `load` under `limit`, then always runs `close`
async fn load_then_close<T>(
    limit: Duration,
    load: impl Future<Output = Result<T, FetchError>>,
    close: impl Future<Output = ()>,
) -> Result<T, FetchError> {
    let result = match tokio::time::timeout(limit, load).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::RenderTimeout {
            secs: limit.as_secs(),
        }),
    };
    close.await;
    result
}

/// [`PageRenderer`] backed by a lazily launched headless Chromium
pub struct ChromeRenderer {
    browser: LiveSlot<Browser>,
    user_agent: String,
    chrome_executable: Option<String>,
    timeout: Duration,
    settle: Duration,
}

impl ChromeRenderer {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            browser: LiveSlot::new(),
            user_agent: config.user_agent.clone(),
            chrome_executable: config.chrome_executable.clone(),
            timeout: Duration::from_secs(config.render_timeout_secs),
            settle: Duration::from_millis(config.render_settle_ms),
        }
    }

    async fn launch(&self) -> Result<(Browser, Arc<AtomicBool>), FetchError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.user_agent));
        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(FetchError::Render)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Render(format!("failed to launch browser: {}", e)))?;

        let alive = Arc::new(AtomicBool::new(true));
        let handler_alive = Arc::clone(&alive);
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            handler_alive.store(false, Ordering::SeqCst);
        });

        tracing::info!("Launched headless browser for rendering");
        Ok((browser, alive))
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        let browser = self.browser.get_or_launch(|| self.launch()).await?;
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                self.browser.invalidate().await;
                return Err(FetchError::Render(e.to_string()));
            }
        };

        let load = async {
            page.goto(url)
                .await
                .map_err(|e| FetchError::Render(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| FetchError::Render(e.to_string()))?;
            tokio::time::sleep(self.settle).await;
            page.content()
                .await
                .map_err(|e| FetchError::Render(e.to_string()))
        };
        let tab = page.clone();
        let close = async move {
            if let Err(e) = tab.close().await {
                tracing::warn!("Failed to close page for {}: {}", url, e);
            }
        };

        load_then_close(self.timeout, load, close).await
    }
}
