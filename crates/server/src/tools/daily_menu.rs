//! daily_menu tool implementation.
//!
//! Resolves a restaurant page into a structured menu for one day, served from
//! the per-day cache when possible.

use lunchbox_client::MenuPipeline;
use lunchbox_core::{Error, cache::key::parse_iso_date};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for the daily_menu tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DailyMenuParams {
    /// Restaurant page URL (http or https).
    pub url: String,

    /// Target day as `YYYY-MM-DD`. Defaults to today (server local time).
    #[serde(default)]
    pub date: Option<String>,
}

/// Implementation of the daily_menu tool.
pub async fn menu_impl(pipeline: &MenuPipeline, params: DailyMenuParams) -> Result<CallToolResult, McpError> {
    let date = params
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(parse_iso_date)
        .transpose()?;

    let menu = pipeline.resolve(&params.url, date).await?;

    let json =
        serde_json::to_string_pretty(&menu).map_err(|e| Error::ExtractFailed(format!("failed to serialize menu: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone, Utc};
    use lunchbox_client::{FetchError, MenuRequest, PageFetcher, StructuredExtractor};
    use lunchbox_core::{CacheDb, FixedClock, MenuItem, MenuResult};
    use std::sync::Arc;

    struct StaticPage;

    #[async_trait::async_trait]
    impl PageFetcher for StaticPage {
        async fn fetch(&self, _url: &url::Url) -> Result<String, FetchError> {
            Ok("<html><body><h2>Polední menu</h2><p>Smažený sýr, hranolky 159 Kč</p></body></html>".into())
        }
    }

    struct EchoExtractor;

    #[async_trait::async_trait]
    impl StructuredExtractor for EchoExtractor {
        async fn extract(&self, req: &MenuRequest) -> Result<MenuResult, Error> {
            Ok(MenuResult {
                restaurant_name: "Hospoda Na Rohu".into(),
                date: req.iso_date(),
                day_of_week: req.weekday.clone(),
                items: vec![MenuItem {
                    category: "Hlavní jídlo".into(),
                    name: "Smažený sýr, hranolky".into(),
                    price: Some(159.0),
                    allergens: vec![1, 3, 7],
                    weight: None,
                    description: None,
                }],
                daily_menu: true,
                source_url: String::new(),
            })
        }
    }

    async fn pipeline() -> MenuPipeline {
        let noon = Local.with_ymd_and_hms(2025, 10, 22, 12, 0, 0).single().unwrap().with_timezone(&Utc);
        let cache = CacheDb::open_in_memory().await.unwrap().with_clock(Arc::new(FixedClock(noon)));
        MenuPipeline::builder(cache, Arc::new(StaticPage), Arc::new(EchoExtractor)).build().unwrap()
    }

    fn output(result: &CallToolResult) -> MenuResult {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_daily_menu_with_date() {
        let pipeline = pipeline().await;
        let params = DailyMenuParams { url: "https://x.test/menu".into(), date: Some("2025-10-23".into()) };

        let result = menu_impl(&pipeline, params).await.unwrap();
        let menu = output(&result);
        assert_eq!(menu.date, "2025-10-23");
        assert_eq!(menu.day_of_week, "Thursday");
        assert_eq!(menu.source_url, "https://x.test/menu");
        assert_eq!(menu.items[0].allergens, vec![1, 3, 7]);
    }

    #[tokio::test]
    async fn test_daily_menu_defaults_to_today() {
        let pipeline = pipeline().await;
        let params = DailyMenuParams { url: "https://x.test/menu".into(), date: None };

        let menu = output(&menu_impl(&pipeline, params).await.unwrap());
        assert_eq!(menu.date, "2025-10-22");
    }

    #[tokio::test]
    async fn test_daily_menu_invalid_date() {
        let pipeline = pipeline().await;
        let params = DailyMenuParams { url: "https://x.test/menu".into(), date: Some("22.10.2025".into()) };

        let err = menu_impl(&pipeline, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_daily_menu_invalid_url() {
        let pipeline = pipeline().await;
        let params = DailyMenuParams { url: "mailto:obed@x.test".into(), date: None };

        let err = menu_impl(&pipeline, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
