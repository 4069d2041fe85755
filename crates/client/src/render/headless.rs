//! Chromium renderer that launches one isolated browser per call.
//!
//! Only navigation and the final content capture can fail a render. Consent
//! banners, lazy-load scrolling and following a menu link are attempted and
//! skipped on failure.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::LoaderId;
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, FrameId, SetLifecycleEventsEnabledParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use url::Url;

use super::{RenderError, RenderOptions, RenderedPage, Renderer};

/// Consent dialogs tried in order; the first one that can be clicked wins.
const CONSENT_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "#CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll",
    "#CybotCookiebotDialogBodyButtonAccept",
    ".cc-allow",
    ".cc-btn.cc-dismiss",
    "#cookie-accept",
    "button[data-cookiefirst-action='accept']",
    "button[aria-label*='Accept']",
    "button[aria-label*='Přijmout']",
];

/// Clicks the first visible button whose label reads like "accept all".
const CONSENT_TEXT_JS: &str = r#"(() => {
    const words = ['přijmout vše', 'přijmout', 'souhlasím', 'rozumím', 'accept all', 'accept', 'agree', 'allow all', 'ok'];
    const buttons = Array.from(document.querySelectorAll('button, a[role="button"], [role="button"]'));
    for (const word of words) {
        const hit = buttons.find(b => b.offsetParent !== null && (b.innerText || '').trim().toLowerCase() === word);
        if (hit) { hit.click(); return true; }
    }
    return false;
})()"#;

/// Clicks the first link whose target or label points at a menu section.
const MENU_LINK_JS: &str = r#"(() => {
    const pattern = /(denni|denní|poledni|polední|jidelni|jídelní|obed|oběd|lunch|menu)/i;
    const here = location.href.split('#')[0];
    const links = Array.from(document.querySelectorAll('a[href]'));
    const hit = links.find(a => {
        const href = a.getAttribute('href') || '';
        if (href.startsWith('javascript:') || href.startsWith('mailto:') || href.startsWith('tel:')) return false;
        if (a.href.split('#')[0] === here && !href.startsWith('#')) return false;
        return pattern.test(href) || pattern.test(a.innerText || '');
    });
    if (!hit) return false;
    hit.click();
    return true;
})()"#;

const SCROLL_BOTTOM_JS: &str = "window.scrollTo(0, document.body ? document.body.scrollHeight : 0)";
const SCROLL_TOP_JS: &str = "window.scrollTo(0, 0)";

/// Wait after a consent click or a followed link.
const STEP_PAUSE: Duration = Duration::from_millis(500);

/// Upper bound on waiting for a navigation caused by a menu-link click.
const LINK_NAV_TIMEOUT: Duration = Duration::from_secs(5);

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Headless Chrome/Chromium renderer using chromiumoxide.
///
/// Holds no browser between calls: every [`Renderer::render`] launches its
/// own instance with a throwaway profile and tears it down before returning.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    executable: Option<PathBuf>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific Chrome/Chromium binary instead of auto-detection.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }
}

/// A launched browser and everything needed to tear it down.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl BrowserSession {
    async fn launch(executable: Option<&PathBuf>, opts: &RenderOptions) -> Result<Self, RenderError> {
        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        let profile_dir = std::env::temp_dir().join(format!("lunchbox-render-{}-{seq}", std::process::id()));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&profile_dir)
            .window_size(opts.viewport.0, opts.viewport.1)
            .request_timeout(Duration::from_millis(opts.timeout_ms))
            .arg(format!("--user-agent={}", opts.user_agent))
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(RenderError::BrowserLaunch)?;

        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(e) => {
                remove_profile(&profile_dir);
                return Err(RenderError::BrowserLaunch(e.to_string()));
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        Ok(Self { browser, handler, profile_dir })
    }

    /// Close the browser process and stop its event loop.
    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("browser close failed: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("browser wait failed: {e}");
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Covers cancellation: the child process is killed by `Browser`'s own drop.
        self.handler.abort();
        remove_profile(&self.profile_dir);
    }
}

fn remove_profile(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        tracing::trace!(dir = %dir.display(), "profile cleanup skipped: {e}");
    }
}

/// Run a best-effort browser step, logging and discarding its failure.
async fn attempt<T>(step: &'static str, fut: impl Future<Output = Result<T, CdpError>>) -> Option<T> {
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(step, "best-effort render step skipped: {e}");
            None
        }
    }
}

async fn dismiss_consent(page: &Page) {
    for selector in CONSENT_SELECTORS {
        let Some(element) = attempt("consent-find", page.find_element(*selector)).await else {
            continue;
        };
        if attempt("consent-click", element.click()).await.is_some() {
            tracing::debug!(selector, "dismissed consent dialog");
            tokio::time::sleep(STEP_PAUSE).await;
            return;
        }
    }

    let clicked = attempt("consent-text", page.evaluate(CONSENT_TEXT_JS))
        .await
        .and_then(|r| r.into_value::<bool>().ok())
        .unwrap_or(false);
    if clicked {
        tracing::debug!("dismissed consent dialog by label");
        tokio::time::sleep(STEP_PAUSE).await;
    }
}

async fn trigger_lazy_load(page: &Page, pause: Duration) {
    if attempt("scroll-bottom", page.evaluate(SCROLL_BOTTOM_JS)).await.is_some() {
        tokio::time::sleep(pause).await;
    }
    if attempt("scroll-top", page.evaluate(SCROLL_TOP_JS)).await.is_some() {
        tokio::time::sleep(pause / 2).await;
    }
}

async fn follow_menu_link(page: &Page) {
    let clicked = attempt("menu-link", page.evaluate(MENU_LINK_JS))
        .await
        .and_then(|r| r.into_value::<bool>().ok())
        .unwrap_or(false);
    if !clicked {
        return;
    }

    tracing::debug!("followed in-page menu link");
    match tokio::time::timeout(LINK_NAV_TIMEOUT, page.wait_for_navigation()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::debug!("menu link navigation failed: {e}"),
        Err(_) => tracing::debug!("menu link navigation still pending, continuing"),
    }
    tokio::time::sleep(STEP_PAUSE).await;
}

/// Wait for the `networkIdle` lifecycle event of the document most recently
/// started in `frame` (any frame when unknown). False if the stream ended first.
async fn network_idle(
    events: impl futures_util::Stream<Item = Arc<EventLifecycleEvent>>, frame: Option<FrameId>,
) -> bool {
    let mut events = std::pin::pin!(events);
    let mut loader: Option<LoaderId> = None;
    while let Some(event) = events.next().await {
        if frame.as_ref().is_some_and(|f| *f != event.frame_id) {
            continue;
        }
        match event.name.as_str() {
            "init" => loader = Some(event.loader_id.clone()),
            "networkIdle" if loader.as_ref().is_none_or(|l| *l == event.loader_id) => return true,
            _ => {}
        }
    }
    false
}

async fn drive(browser: &Browser, url: &Url, opts: &RenderOptions) -> Result<(String, Url), RenderError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| RenderError::Navigation(e.to_string()))?;

    attempt("lifecycle-events", page.execute(SetLifecycleEventsEnabledParams::new(true))).await;
    let lifecycle = page
        .event_listener::<EventLifecycleEvent>()
        .await
        .map_err(|e| RenderError::Navigation(e.to_string()))?;

    let deadline = tokio::time::Instant::now() + Duration::from_millis(opts.timeout_ms);
    match tokio::time::timeout_at(deadline, page.goto(url.as_str())).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(RenderError::Navigation(e.to_string())),
        Err(_) => return Err(RenderError::Timeout(opts.timeout_ms)),
    }

    // Past the load event a page that never goes quiet is still usable.
    let main_frame = attempt("main-frame", page.mainframe()).await.flatten();
    if !matches!(tokio::time::timeout_at(deadline, network_idle(lifecycle, main_frame)).await, Ok(true)) {
        tracing::debug!(%url, "network not idle before the navigation deadline, continuing");
    }

    dismiss_consent(&page).await;
    trigger_lazy_load(&page, Duration::from_millis(opts.scroll_pause_ms)).await;
    follow_menu_link(&page).await;
    tokio::time::sleep(Duration::from_millis(opts.settle_ms)).await;

    let html = page
        .content()
        .await
        .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;

    let final_url = attempt("final-url", page.url())
        .await
        .flatten()
        .and_then(|u| Url::parse(&u).ok())
        .unwrap_or_else(|| url.clone());

    Ok((html, final_url))
}

#[async_trait::async_trait]
impl Renderer for HeadlessRenderer {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let start = Instant::now();
        let mut session = BrowserSession::launch(self.executable.as_ref(), opts).await?;

        let outcome = drive(&session.browser, url, opts).await;
        session.close().await;

        let (html, final_url) = outcome?;
        let render_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(%url, %final_url, render_time_ms, bytes = html.len(), "rendered page");

        Ok(RenderedPage { html, final_url, render_time_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_selectors_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for selector in CONSENT_SELECTORS {
            assert!(seen.insert(*selector), "duplicate selector {selector}");
        }
    }

    #[test]
    fn test_with_executable() {
        let renderer = HeadlessRenderer::new().with_executable("/usr/bin/chromium");
        assert_eq!(renderer.executable, Some(PathBuf::from("/usr/bin/chromium")));
    }

    fn lifecycle(frame: &str, loader: &str, name: &str) -> Arc<EventLifecycleEvent> {
        Arc::new(EventLifecycleEvent {
            frame_id: FrameId::new(frame),
            loader_id: LoaderId::new(loader),
            name: name.to_string(),
            timestamp: chromiumoxide::cdp::browser_protocol::network::MonotonicTime::new(0.0),
        })
    }

    #[tokio::test]
    async fn test_network_idle_waits_for_current_document() {
        let events = futures_util::stream::iter(vec![
            lifecycle("main", "blank", "networkIdle"),
            lifecycle("main", "menu", "init"),
            lifecycle("ad-frame", "ad", "networkIdle"),
            lifecycle("main", "menu", "load"),
            lifecycle("main", "menu", "networkIdle"),
        ]);
        assert!(network_idle(events, Some(FrameId::new("main"))).await);

        let never_idle = futures_util::stream::iter(vec![
            lifecycle("main", "menu", "init"),
            lifecycle("main", "blank", "networkIdle"),
            lifecycle("ad-frame", "ad", "networkIdle"),
        ]);
        assert!(!network_idle(never_idle, Some(FrameId::new("main"))).await);
    }

    #[test]
    fn test_remove_profile_deletes_dir() {
        let dir = std::env::temp_dir().join(format!("lunchbox-render-test-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("Default")).unwrap();
        remove_profile(&dir);
        assert!(!dir.exists());
        remove_profile(&dir);
    }

    #[tokio::test]
    async fn test_failed_launch_leaves_no_profile_dir() {
        let renderer = HeadlessRenderer::new().with_executable("/nonexistent/lunchbox-chromium");
        let before = SESSION_SEQ.load(Ordering::Relaxed);
        let err = renderer.render(&Url::parse("https://x.test/menu").unwrap(), &RenderOptions::default()).await;
        assert!(matches!(err, Err(RenderError::BrowserLaunch(_))));

        let seq = (before..SESSION_SEQ.load(Ordering::Relaxed)).collect::<Vec<_>>();
        assert!(!seq.is_empty());
        for n in seq {
            let dir = std::env::temp_dir().join(format!("lunchbox-render-{}-{n}", std::process::id()));
            assert!(!dir.exists(), "{} left behind", dir.display());
        }
    }

    #[tokio::test]
    #[ignore = "requires network and Chrome/Chromium"]
    async fn test_render_simple_page() {
        let renderer = HeadlessRenderer::new();
        let url = Url::parse("https://example.com").unwrap();
        let opts = RenderOptions { settle_ms: 200, scroll_pause_ms: 100, ..Default::default() };

        let page = renderer.render(&url, &opts).await.unwrap();
        assert!(page.html.contains("<html"));
        assert_eq!(page.final_url.as_str(), "https://example.com/");
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_render_unreachable_host_is_navigation_error() {
        let renderer = HeadlessRenderer::new();
        let url = Url::parse("http://127.0.0.1:9/menu").unwrap();
        let opts = RenderOptions { timeout_ms: 5_000, settle_ms: 0, ..Default::default() };

        let err = renderer.render(&url, &opts).await.unwrap_err();
        assert!(matches!(err, RenderError::Navigation(_) | RenderError::Timeout(_)));
    }
}
