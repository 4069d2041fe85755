//! Static HTTP fetch.
//!
//! ### URL Normalization
//! - Trim whitespace, remove fragments
//! - Preserve scheme, host, path and query
//!
//! ### Single GET
//! - Bounded timeout (default: 10s), browser-like User-Agent
//! - Max redirects: 5, max body bytes: 5MB (configurable)
//! - No internal retries; failures are classified into [`FetchError`]
//!
//! ### Decoding
//! - Charset from `Content-Type`, else a `<meta>` declaration near the top
//!   of the document, else UTF-8 (a BOM always wins)

pub mod error;
pub mod url;

use encoding_rs::{Encoding, UTF_8};
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use error::FetchError;
pub use url::{normalize, validate};

use lunchbox_core::{AppConfig, Error};

/// Something that can fetch a page's raw markup without executing scripts.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a URL once and return the response body as text.
    async fn fetch(&self, url: &::url::Url) -> Result<String, FetchError>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: desktop Chrome)
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let app = AppConfig::default();
        let timeout = app.timeout();
        Self { user_agent: app.user_agent, max_bytes: app.max_bytes, timeout, max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client for the static strategy.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl PageFetcher for FetchClient {
    async fn fetch(&self, url: &::url::Url) -> Result<String, FetchError> {
        let start = Instant::now();

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(header::ACCEPT_LANGUAGE, "cs,en;q=0.8")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { status: status.as_u16(), url: url.to_string() });
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchError::Other(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        if bytes.len() > self.config.max_bytes {
            return Err(FetchError::Other(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            final_url,
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(decode_body(&bytes, content_type.as_deref()))
    }
}

/// How far into the body a `<meta charset>` declaration is looked for.
const META_SNIFF_BYTES: usize = 1024;

/// Decode a response body to text using the declared charset.
///
/// Unknown labels fall back to UTF-8; invalid sequences become U+FFFD.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_param)
        .or_else(|| meta_charset(&bytes[..bytes.len().min(META_SNIFF_BYTES)]))
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = used.name(), "body contained invalid sequences");
    }
    text.into_owned()
}

/// `charset` parameter of a `Content-Type` value.
fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}

/// Charset from `<meta charset=..>` or `<meta http-equiv content="..; charset=..">`.
fn meta_charset(head: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let at = head.find("charset=")? + "charset=".len();
    let label: String = head[at..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|&c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();
    (!label.is_empty()).then_some(label)
}
