//! OpenAI-compatible chat-completions extractor.
//!
//! ### Request
//! - `POST {base_url}/chat/completions` with `Authorization: Bearer <key>`.
//! - `response_format: {"type": "json_object"}`, temperature 0.
//! - Page text is cut to a fixed character budget; at most [`MAX_IMAGES`]
//!   image URLs are attached as `image_url` content parts.
//!
//! ### Response
//! - `choices[0].message.content` must be a JSON object describing the menu.
//!   Target date and weekday always come from the request, never the model.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lunchbox_core::{AppConfig, Error, MenuItem, MenuResult};
use reqwest::header;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{MenuRequest, StructuredExtractor};

/// Character budget for page text sent upstream.
pub const MAX_TEXT_CHARS: usize = 20_000;

/// Upper bound on attached image URLs.
pub const MAX_IMAGES: usize = 4;

const SYSTEM_PROMPT: &str = "You extract restaurant daily menus from web page content. \
Answer with a single JSON object and nothing else, using exactly these keys: \
\"restaurant_name\" (string), \
\"items\" (array of objects with \"category\" string, \"name\" string, \"price\" number or null, \
\"allergens\" array of integers 1-14, \"weight\" string or null, \"description\" string or null), \
\"daily_menu\" (boolean: true only if the page lists dishes offered on a specific day). \
Only include items offered on the requested day. Keep dish names in the page's language. \
If nothing is offered that day, return an empty items array.";

/// Errors from the chat-completions client.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("missing API key: set LUNCHBOX_LLM_API_KEY")]
    MissingApiKey,

    #[error("request timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// The completion carried no message content.
    #[error("empty completion")]
    EmptyResponse,

    /// The completion or its content was not the expected JSON.
    #[error("malformed response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ChatError::Timeout } else { ChatError::Network(Arc::new(err)) }
    }
}

impl From<ChatError> for Error {
    fn from(err: ChatError) -> Self {
        Error::ExtractFailed(err.to_string())
    }
}

/// Chat extractor configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ChatConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ChatError> {
        let api_key = config
            .llm_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ChatError::MissingApiKey)?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
            timeout: config.llm_timeout(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Menu as the model reports it; missing fields fall back to empty values.
#[derive(Debug, Deserialize)]
struct ModelMenu {
    #[serde(default)]
    restaurant_name: Option<String>,
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    daily_menu: bool,
}

/// One item as the model reports it. Prices and allergens often come back as
/// printed text ("45 Kč", "1, 3, 7") rather than numbers.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelItem {
    category: Option<String>,
    name: Option<String>,
    price: Option<Value>,
    allergens: Option<Value>,
    weight: Option<Value>,
    description: Option<String>,
}

impl ModelItem {
    /// `None` for items without a usable name.
    fn into_menu_item(self) -> Option<MenuItem> {
        let name = self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
        let mut allergens: Vec<u8> = self
            .allergens
            .as_ref()
            .map(allergen_codes)
            .unwrap_or_default()
            .into_iter()
            .filter(|code| (1..=14).contains(code))
            .collect();
        allergens.dedup();

        Some(MenuItem {
            category: self.category.unwrap_or_default().trim().to_string(),
            name,
            price: self.price.as_ref().and_then(price_value),
            allergens,
            weight: self.weight.as_ref().and_then(|w| match w {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            description: self.description.filter(|d| !d.trim().is_empty()),
        })
    }
}

/// Numeric price from a number or printed text such as "145 Kč", "89,50" or "1 290,-".
fn price_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let start = s.find(|c: char| c.is_ascii_digit())?;
            let digits: String = s[start..]
                .chars()
                .take_while(|&c| c.is_ascii_digit() || matches!(c, ',' | '.' | ' ' | '\u{a0}'))
                .filter(|c| !c.is_whitespace())
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            digits.trim_end_matches('.').parse().ok()
        }
        _ => None,
    }
}

fn allergen_codes(value: &Value) -> Vec<u8> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()).into_iter().collect(),
        Value::String(s) => s.split(|c: char| !c.is_ascii_digit()).filter_map(|part| part.parse().ok()).collect(),
        Value::Array(values) => values.iter().flat_map(allergen_codes).collect(),
        _ => Vec::new(),
    }
}

/// Structured extractor backed by an OpenAI-compatible chat API.
#[derive(Debug, Clone)]
pub struct ChatExtractor {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatExtractor {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        if config.api_key.is_empty() {
            return Err(ChatError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn request_body(&self, req: &MenuRequest) -> Value {
        let text: String = req.text.chars().take(MAX_TEXT_CHARS).collect();
        let prompt = format!(
            "Target date: {} ({}).\nSource: {}\n\nPage content:\n{}",
            req.iso_date(),
            req.weekday,
            req.source_url,
            text
        );

        let mut parts = vec![json!({ "type": "text", "text": prompt })];
        parts.extend(
            req.images
                .iter()
                .take(MAX_IMAGES)
                .map(|url| json!({ "type": "image_url", "image_url": { "url": url } })),
        );

        json!({
            "model": self.config.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": parts },
            ],
        })
    }
}

/// Turn a raw completion body into a menu for the requested day.
fn parse_completion(body: &[u8], req: &MenuRequest) -> Result<MenuResult, ChatError> {
    let completion: Completion = serde_json::from_slice(body).map_err(|e| ChatError::Parse(e.to_string()))?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(ChatError::EmptyResponse)?;

    let menu: ModelMenu =
        serde_json::from_str(strip_code_fence(&content)).map_err(|e| ChatError::Parse(format!("menu content: {e}")))?;

    Ok(MenuResult {
        restaurant_name: menu.restaurant_name.unwrap_or_default(),
        date: req.iso_date(),
        day_of_week: req.weekday.clone(),
        items: menu
            .items
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<ModelItem>(raw) {
                Ok(item) => item.into_menu_item(),
                Err(e) => {
                    tracing::debug!("skipping unreadable menu item: {e}");
                    None
                }
            })
            .collect(),
        daily_menu: menu.daily_menu,
        source_url: req.source_url.clone(),
    })
}

/// Some models wrap JSON in a Markdown code fence despite `json_object` mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[async_trait::async_trait]
impl StructuredExtractor for ChatExtractor {
    async fn extract(&self, req: &MenuRequest) -> Result<MenuResult, Error> {
        let start = Instant::now();

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "application/json")
            .json(&self.request_body(req))
            .send()
            .await
            .map_err(ChatError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::HttpError { status: status.as_u16() }.into());
        }

        let bytes = response.bytes().await.map_err(ChatError::from)?;
        let menu = parse_completion(&bytes, req)?;

        tracing::debug!(
            url = %req.source_url,
            date = %req.iso_date(),
            items = menu.items.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "structured extraction completed"
        );

        Ok(menu)
    }
}
