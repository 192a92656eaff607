//! Per-worker browser session lifecycle
//!
//! Each worker owns exactly one headless rendering context. The session
//! state machine is `absent → creating → ready ⇄ navigating → recycling →
//! absent`; any failure while creating or navigating drops the handle and
//! surfaces the error, leaving the next `ensure()` to start fresh.
//!
//! Creation is serialized process-wide by a width-1 semaphore — spawning
//! many Chromium instances at once is exactly how hosts run out of pids —
//! and staggered with a small jitter keyed by worker index.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::launch::launch_browser;
use super::profile::{create_unique_profile, remove_profile_dir};
use super::registry::SessionRegistry;
use crate::extract::RenderedPage;
use crate::extract::selectors::{LOAD_MORE, POPUP_CLOSE};
use crate::guard::ResourceGuard;

/// Maximum progressive scroll passes per page.
const MAX_SCROLL_ATTEMPTS: usize = 4;
/// Elements clicked per popup-close selector family.
const POPUPS_PER_SELECTOR: usize = 2;
/// Load-more buttons clicked per selector family.
const LOAD_MORE_PER_SELECTOR: usize = 2;
/// Extra delay applied before spawning when the host is already hot.
const PRE_SPAWN_BACKOFF: Duration = Duration::from_secs(10);

/// Session knobs owned by the pool configuration.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Recycle after this many processed URLs.
    pub urls_per_session: u32,
    /// How long to wait for `<body>` after navigation.
    pub wait_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            urls_per_session: 10,
            wait_seconds: 12,
        }
    }
}

struct SessionHandle {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

/// One worker's rendering context.
pub struct BrowserSession {
    worker_index: usize,
    handle: Option<SessionHandle>,
    urls_processed: u32,
    config: SessionConfig,
    guard: ResourceGuard,
    launch_gate: Arc<Semaphore>,
    registry: Arc<SessionRegistry>,
}

impl BrowserSession {
    pub fn new(
        worker_index: usize,
        config: SessionConfig,
        guard: ResourceGuard,
        launch_gate: Arc<Semaphore>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            worker_index,
            handle: None,
            urls_processed: 0,
            config,
            guard,
            launch_gate,
            registry,
        }
    }

    pub fn urls_processed(&self) -> u32 {
        self.urls_processed
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Count one processed URL against the recycle budget.
    pub fn mark_processed(&mut self) {
        self.urls_processed += 1;
    }

    /// Make sure a browser handle exists, recycling first when the URL
    /// budget is spent or the host is under resource pressure.
    pub async fn ensure(&mut self) -> Result<()> {
        if self.handle.is_some() {
            if self.urls_processed >= self.config.urls_per_session {
                info!(
                    worker = self.worker_index,
                    urls = self.urls_processed,
                    "recycling session after url budget"
                );
                self.recycle().await;
            } else if self.guard.over_pressure(&self.guard.snapshot()) {
                info!(worker = self.worker_index, "recycling session under resource pressure");
                self.recycle().await;
            }
        }
        if self.handle.is_some() {
            return Ok(());
        }

        // creating: one browser spawn at a time, process-wide.
        let _permit = self
            .launch_gate
            .acquire()
            .await
            .context("browser launch gate closed")?;

        tokio::time::sleep(self.startup_jitter()).await;
        if self.guard.over_pressure(&self.guard.snapshot()) {
            warn!(worker = self.worker_index, "host under pressure, delaying browser spawn");
            tokio::time::sleep(PRE_SPAWN_BACKOFF).await;
        }

        let profile = create_unique_profile()?;
        let profile_dir = profile.into_path();
        match launch_browser(&profile_dir).await {
            Ok((browser, handler)) => {
                self.registry.register(&profile_dir);
                self.handle = Some(SessionHandle {
                    browser,
                    handler,
                    profile_dir,
                });
                self.urls_processed = 0;
                debug!(worker = self.worker_index, "browser session ready");
                Ok(())
            }
            Err(err) => {
                remove_profile_dir(&profile_dir);
                Err(err)
            }
        }
    }

    /// Startup jitter in 0.5–5 s keyed by worker index, so a cold pool
    /// doesn't stampede the kernel even through the launch gate.
    fn startup_jitter(&self) -> Duration {
        let keyed = 0.5 + (self.worker_index % 10) as f64 * 0.4;
        let noise = rand::rng().random_range(0.0..0.9);
        Duration::from_secs_f64((keyed + noise).min(5.0))
    }

    /// Render one URL: fresh tab, cookies cleared, navigation with a 30 s
    /// budget, `<body>` wait, popup dismissal, progressive scroll with
    /// load-more clicks, then the final DOM serialization.
    pub async fn navigate(&mut self, url: &str) -> Result<RenderedPage> {
        self.ensure().await?;
        let handle = self
            .handle
            .as_ref()
            .context("browser session not available")?;

        let page = handle
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        let rendered = self.drive_page(&page, url).await;
        if let Err(e) = page.close().await {
            debug!("page close failed: {e}");
        }

        match rendered {
            Ok(rendered) => Ok(rendered),
            Err(err) => {
                // navigating failed: drop the context so the next job
                // starts from a clean browser.
                self.recycle().await;
                Err(err)
            }
        }
    }

    async fn drive_page(&self, page: &Page, url: &str) -> Result<RenderedPage> {
        if let Err(e) = page.execute(ClearBrowserCookiesParams::default()).await {
            debug!("cookie reset failed: {e}");
        }

        with_timeout(
            async { page.goto(url).await.map_err(anyhow::Error::from) },
            Duration::from_secs(30),
            "navigation",
        )
        .await?;

        self.wait_for_body(page).await;
        dismiss_popups(page).await;
        self.progressive_scroll(page).await;

        let html = page.content().await.context("failed to read page content")?;
        let body_text = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .ok()
            .and_then(|res| res.into_value::<String>().ok())
            .unwrap_or_default();

        Ok(RenderedPage::new(html, body_text))
    }

    /// Soft wait for `<body>`: extraction still runs on whatever rendered.
    async fn wait_for_body(&self, page: &Page) {
        let deadline = Instant::now() + Duration::from_secs(self.config.wait_seconds);
        loop {
            if page.find_element("body").await.is_ok() {
                return;
            }
            if Instant::now() >= deadline {
                debug!("body did not appear within {}s", self.config.wait_seconds);
                return;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    /// Scroll to the bottom up to four times, clicking load-more buttons
    /// and re-dismissing popups between passes; stops when the document
    /// height stabilizes.
    async fn progressive_scroll(&self, page: &Page) {
        let mut last_height = page_height(page).await.unwrap_or(0.0);
        for _ in 0..MAX_SCROLL_ATTEMPTS {
            if page
                .evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await
                .is_err()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1200)).await;
            click_load_more(page).await;
            dismiss_popups(page).await;

            let Some(new_height) = page_height(page).await else {
                break;
            };
            if new_height <= last_height {
                break;
            }
            last_height = new_height;
        }
    }

    /// recycling: close the browser, abort its handler, delete the
    /// profile directory, reset the URL counter.
    pub async fn recycle(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        if let Err(e) = handle.browser.close().await {
            debug!("browser close failed: {e}");
        }
        if let Err(e) = handle.browser.wait().await {
            debug!("browser wait failed: {e}");
        }
        handle.handler.abort();
        self.registry.deregister(&handle.profile_dir);
        remove_profile_dir(&handle.profile_dir);
        self.urls_processed = 0;
        debug!(worker = self.worker_index, "browser session recycled");
    }

    /// Terminal cleanup; identical to recycle but logged as shutdown.
    pub async fn close(&mut self) {
        if self.handle.is_some() {
            info!(worker = self.worker_index, "closing browser session");
            self.recycle().await;
        }
    }
}

async fn page_height(page: &Page) -> Option<f64> {
    page.evaluate("document.body ? document.body.scrollHeight : 0")
        .await
        .ok()
        .and_then(|res| res.into_value::<f64>().ok())
}

/// Click up to two visible popup-close controls per selector family.
async fn dismiss_popups(page: &Page) {
    for selector in POPUP_CLOSE {
        let Ok(elements) = page.find_elements(*selector).await else {
            continue;
        };
        for element in elements.into_iter().take(POPUPS_PER_SELECTOR) {
            if element.click().await.is_ok() {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
        }
    }
}

/// Click load-more style buttons so lazy result grids fill in.
async fn click_load_more(page: &Page) {
    for selector in LOAD_MORE {
        let Ok(elements) = page.find_elements(*selector).await else {
            continue;
        };
        for element in elements.into_iter().take(LOAD_MORE_PER_SELECTOR) {
            if element.click().await.is_ok() {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Bound an async page operation with an explicit timeout.
async fn with_timeout<F, T>(operation: F, timeout: Duration, name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("{name} timeout after {}s", timeout.as_secs())),
    }
}
