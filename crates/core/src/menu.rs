//! Structured daily-menu data.
//!
//! A [`MenuResult`] is what the structured-extraction step produces and what
//! the cache stores. The cache only keeps the serialized JSON form, so every
//! field must survive a serde round-trip unchanged.

use serde::{Deserialize, Serialize};

/// One line item on a daily menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MenuItem {
    /// Category label as printed on the page (e.g. "Polévka", "Hlavní jídlo").
    pub category: String,
    /// Dish name.
    pub name: String,
    /// Price in the page's currency, when one is shown.
    #[serde(default)]
    pub price: Option<f64>,
    /// EU allergen codes (1-14).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergens: Vec<u8>,
    /// Portion weight or volume as printed (e.g. "150 g", "0,33 l").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A restaurant's menu for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MenuResult {
    pub restaurant_name: String,
    /// Target date as `YYYY-MM-DD`.
    pub date: String,
    /// English weekday name of `date`.
    pub day_of_week: String,
    pub items: Vec<MenuItem>,
    /// Whether the source is genuinely a per-day menu rather than a standing
    /// à la carte list.
    pub daily_menu: bool,
    /// The normalized URL the menu was read from.
    pub source_url: String,
}

impl MenuResult {
    /// Serialize to the JSON payload stored in the cache.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Rebuild a menu from a cached JSON payload.
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
