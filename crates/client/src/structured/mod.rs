//! Structured menu extraction.
//!
//! The pipeline hands normalized page text, candidate menu images and the
//! target day to a [`StructuredExtractor`] and gets a [`MenuResult`] back.
//! Extractors are stateless from the pipeline's point of view: no caching and
//! no retries happen behind this trait.

pub mod chat;

pub use chat::{ChatConfig, ChatError, ChatExtractor};

use chrono::NaiveDate;
use lunchbox_core::{Error, MenuResult};

/// Input for one extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuRequest {
    /// Normalized page text.
    pub text: String,
    /// Absolute URLs of candidate menu images, in document order.
    pub images: Vec<String>,
    pub date: NaiveDate,
    /// English weekday name of `date`.
    pub weekday: String,
    /// Normalized URL the content came from.
    pub source_url: String,
}

impl MenuRequest {
    pub fn new(text: String, images: Vec<String>, date: NaiveDate, source_url: String) -> Self {
        Self { text, images, date, weekday: weekday_name(date), source_url }
    }

    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// English weekday name ("Monday" ... "Sunday").
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Turns page content into a structured menu for one day.
#[async_trait::async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, req: &MenuRequest) -> Result<MenuResult, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_name() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 22).unwrap();
        assert_eq!(weekday_name(date), "Wednesday");
    }

    #[test]
    fn test_menu_request_new() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();
        let req = MenuRequest::new("Polévka".into(), vec![], date, "https://x.test/menu".into());
        assert_eq!(req.weekday, "Sunday");
        assert_eq!(req.iso_date(), "2025-10-26");
    }
}
