//! Headless browser rendering for script-built pages.
//!
//! This module provides the renderer trait used as the fallback fetch
//! strategy, and (behind the `render` feature) an implementation using
//! chromiumoxide for headless Chrome/Chromium browser control.

#[cfg(feature = "render")]
mod headless;

#[cfg(feature = "render")]
pub use headless::HeadlessRenderer;

use lunchbox_core::{AppConfig, Error};
use thiserror::Error;
use url::Url;

/// Errors that can occur during page rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Failed to get page content.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Timeout waiting for page to load.
    #[error("render timeout after {0}ms")]
    Timeout(u64),
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Timeout(_) => Error::FetchTimeout(err.to_string()),
            RenderError::Navigation(_) => Error::Network(err.to_string()),
            RenderError::BrowserLaunch(_) | RenderError::ContentRetrieval(_) => Error::RenderFailed(err.to_string()),
        }
    }
}

/// Options for rendering a page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Navigation timeout in milliseconds (default: 20000).
    pub timeout_ms: u64,

    /// Pause after each scroll used to trigger lazy loading (default: 1000).
    pub scroll_pause_ms: u64,

    /// Final settle period before the document is captured (default: 2000).
    pub settle_ms: u64,

    /// Viewport dimensions (default: 1366x900).
    pub viewport: (u32, u32),

    /// User-Agent presented by the browser.
    pub user_agent: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RenderOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_ms: config.render_timeout_ms,
            scroll_pause_ms: 1_000,
            settle_ms: config.render_settle_ms,
            viewport: (1366, 900),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Result of rendering a page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Rendered HTML content.
    pub html: String,

    /// Final URL after redirects and any followed menu link.
    pub final_url: Url,

    /// Time taken to render in milliseconds.
    pub render_time_ms: u64,
}

/// Renderer trait for headless browser page rendering.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Render a URL to HTML via headless browser.
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError>;
}
