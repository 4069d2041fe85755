//! Daily-menu lookup pipeline.
//!
//! ### Request flow
//! 1. Normalize the URL (strip fragment), validate it, pick the target date
//!    (today in local time unless given).
//! 2. Cache hit for `(url, date)`: return without any network activity.
//! 3. Miss: join or start the single flight for the key. The leader re-checks
//!    the cache, acquires content, hands it to the structured extractor and
//!    stores the result before returning it.
//!
//! ### Fetch strategy
//! - Static fetch first. Menu-like content (per [`MenuClassifier`]) is accepted.
//! - A failed static fetch or non-menu content escalates to one rendered
//!   fetch, whose output is accepted as final.
//! - A failed rendered fetch falls back to the static content when there is
//!   some; the lookup ends with a fetch error only when both strategies fail.
//!
//! Cache failures never fail a lookup; they are logged and treated as a miss
//! (read) or skipped (write).

pub mod flight;

pub use flight::{FlightAborted, SingleFlight};

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use lunchbox_core::{CacheDb, CacheKey, Error, HeuristicsConfig, MenuResult};
use url::Url;

use crate::extract::{FetchResult, MenuClassifier};
use crate::fetch::{self, PageFetcher};
use crate::render::{RenderOptions, Renderer};
use crate::structured::{MenuRequest, StructuredExtractor};

/// Which fetch produced the content handed to extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    Static,
    Rendered,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::Static => "static",
            FetchStrategy::Rendered => "rendered",
        }
    }
}

impl std::fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Inner {
    cache: CacheDb,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Option<Arc<dyn Renderer>>,
    render_options: RenderOptions,
    extractor: Arc<dyn StructuredExtractor>,
    classifier: MenuClassifier,
    heuristics: HeuristicsConfig,
    flights: SingleFlight<CacheKey, Result<MenuResult, Error>>,
}

/// Cache-first menu resolver. Cheap to clone; clones share the cache handle
/// and the in-flight registry.
#[derive(Clone)]
pub struct MenuPipeline {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MenuPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuPipeline")
            .field("cache", &self.inner.cache)
            .field("render_enabled", &self.inner.renderer.is_some())
            .field("flights", &self.inner.flights)
            .finish()
    }
}

/// Assembles a [`MenuPipeline`] from its collaborators.
pub struct MenuPipelineBuilder {
    cache: CacheDb,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn StructuredExtractor>,
    renderer: Option<Arc<dyn Renderer>>,
    render_options: RenderOptions,
    heuristics: HeuristicsConfig,
}

impl MenuPipelineBuilder {
    /// Enable the rendered fallback. Without a renderer, static content is
    /// accepted even when it does not look like a menu.
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    pub fn heuristics(mut self, heuristics: HeuristicsConfig) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn build(self) -> Result<MenuPipeline, Error> {
        let classifier = MenuClassifier::new(&self.heuristics)?;
        Ok(MenuPipeline {
            inner: Arc::new(Inner {
                cache: self.cache,
                fetcher: self.fetcher,
                renderer: self.renderer,
                render_options: self.render_options,
                extractor: self.extractor,
                classifier,
                heuristics: self.heuristics,
                flights: SingleFlight::new(),
            }),
        })
    }
}

impl MenuPipeline {
    pub fn builder(
        cache: CacheDb, fetcher: Arc<dyn PageFetcher>, extractor: Arc<dyn StructuredExtractor>,
    ) -> MenuPipelineBuilder {
        MenuPipelineBuilder {
            cache,
            fetcher,
            extractor,
            renderer: None,
            render_options: RenderOptions::default(),
            heuristics: HeuristicsConfig::default(),
        }
    }

    pub fn cache(&self) -> &CacheDb {
        &self.inner.cache
    }

    /// Today's date in local time, according to the cache clock.
    pub fn today(&self) -> NaiveDate {
        self.inner.cache.now().with_timezone(&Local).date_naive()
    }

    /// Resolve the menu published at `url` for `date` (default: today).
    pub async fn resolve(&self, url: &str, date: Option<NaiveDate>) -> Result<MenuResult, Error> {
        let normalized = fetch::normalize(url);
        let target = fetch::validate(&normalized)?;
        let key = CacheKey::new(normalized, date.unwrap_or_else(|| self.today()));

        if let Some(menu) = self.inner.cached(&key).await {
            tracing::info!(url = %key.url, date = %key.iso_date(), "cache hit");
            return Ok(menu);
        }

        let inner = Arc::clone(&self.inner);
        let flight_key = key.clone();
        self.inner
            .flights
            .run(key, move || async move { inner.lead(flight_key, target).await })
            .await
            .unwrap_or_else(|e| Err(Error::Internal(e.to_string())))
    }
}

impl Inner {
    /// Cached menu for a key; read and decode failures count as a miss.
    async fn cached(&self, key: &CacheKey) -> Option<MenuResult> {
        let payload = match self.cache.get_menu(key).await {
            Ok(payload) => payload?,
            Err(e) => {
                tracing::warn!(key = %key, "cache read failed, treating as miss: {e}");
                return None;
            }
        };

        match MenuResult::from_payload(&payload) {
            Ok(menu) => Some(menu),
            Err(e) => {
                tracing::warn!(key = %key, "undecodable cache payload, treating as miss: {e}");
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, menu: &MenuResult) {
        let payload = match menu.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, "menu not serializable, not caching: {e}");
                return;
            }
        };

        if let Err(e) = self.cache.put_menu(key, &payload).await {
            tracing::warn!(key = %key, "cache write failed: {e}");
        }
    }

    /// Work done once per key by the flight leader.
    async fn lead(self: Arc<Self>, key: CacheKey, target: Url) -> Result<MenuResult, Error> {
        if let Some(menu) = self.cached(&key).await {
            tracing::debug!(key = %key, "filled while waiting for flight");
            return Ok(menu);
        }

        let start = Instant::now();
        let (content, strategy) = self.acquire(&target).await?;

        if content.text.is_empty() {
            return Err(Error::EmptyContent(format!("no text extracted from {}", key.url)));
        }

        let request = MenuRequest::new(content.text, content.images, key.date, key.url.clone());
        let mut menu = self.extractor.extract(&request).await?;
        menu.source_url = key.url.clone();

        self.store(&key, &menu).await;

        tracing::info!(
            url = %key.url,
            date = %key.iso_date(),
            strategy = %strategy,
            items = menu.items.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "menu resolved"
        );
        Ok(menu)
    }

    /// Run the static-then-rendered fetch strategy.
    async fn acquire(&self, target: &Url) -> Result<(FetchResult, FetchStrategy), Error> {
        let started = Instant::now();
        let static_outcome = match self.fetcher.fetch(target).await {
            Ok(html) => {
                let content = FetchResult::from_html(&html, target, &self.heuristics);
                if self.classifier.classify(&content) {
                    tracing::debug!(
                        url = %target,
                        strategy = "static",
                        images = content.images.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "static content accepted"
                    );
                    return Ok((content, FetchStrategy::Static));
                }
                tracing::debug!(url = %target, strategy = "static", "static content does not look like a menu");
                Ok(content)
            }
            Err(e) => {
                tracing::info!(url = %target, strategy = "static", "static fetch failed: {e}");
                Err(e)
            }
        };

        let Some(renderer) = &self.renderer else {
            return match static_outcome {
                Ok(content) => {
                    tracing::warn!(url = %target, "rendering disabled, using non-menu static content");
                    Ok((content, FetchStrategy::Static))
                }
                Err(e) => Err(e.into()),
            };
        };

        let started = Instant::now();
        match renderer.render(target, &self.render_options).await {
            Ok(page) => {
                let content = FetchResult::from_html(&page.html, &page.final_url, &self.heuristics);
                tracing::debug!(
                    url = %target,
                    final_url = %page.final_url,
                    strategy = "rendered",
                    images = content.images.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "rendered content accepted"
                );
                Ok((content, FetchStrategy::Rendered))
            }
            Err(e) => {
                tracing::warn!(url = %target, strategy = "rendered", "rendered fetch failed: {e}");
                match static_outcome {
                    Ok(content) => {
                        tracing::warn!(url = %target, "falling back to non-menu static content");
                        Ok((content, FetchStrategy::Static))
                    }
                    Err(static_err) => {
                        tracing::warn!(url = %target, "static fetch had failed too: {static_err}");
                        Err(e.into())
                    }
                }
            }
        }
    }
}
