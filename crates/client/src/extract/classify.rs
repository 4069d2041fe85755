//! Menu-content classifier.
//!
//! Decides whether a static fetch already found the menu or whether the
//! rendered fetch has to run.

use lunchbox_core::{Error, HeuristicsConfig};
use regex::Regex;

use super::FetchResult;

/// Heuristic predicate over extracted text and images.
#[derive(Debug, Clone)]
pub struct MenuClassifier {
    keywords: Vec<String>,
    price: Regex,
    min_text_chars: usize,
}

impl MenuClassifier {
    pub fn new(heuristics: &HeuristicsConfig) -> Result<Self, Error> {
        let price = Regex::new(&heuristics.price_pattern)
            .map_err(|e| Error::InvalidInput(format!("invalid price_pattern: {e}")))?;

        let keywords = heuristics
            .menu_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self { keywords, price, min_text_chars: heuristics.min_text_chars })
    }

    /// True when at least one menu image was found, or the text carries a
    /// currency marker, category word or price.
    pub fn looks_like_menu(&self, text: &str, images: &[String]) -> bool {
        if !images.is_empty() {
            return true;
        }

        let text = text.trim();
        if text.chars().count() < self.min_text_chars {
            return false;
        }

        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str())) || self.price.is_match(text)
    }

    pub fn classify(&self, result: &FetchResult) -> bool {
        self.looks_like_menu(&result.text, &result.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> MenuClassifier {
        MenuClassifier::new(&HeuristicsConfig::default()).unwrap()
    }

    #[test]
    fn test_images_alone_are_enough() {
        assert!(classifier().looks_like_menu("", &["https://bistro.example/menu.jpg".to_string()]));
    }

    #[test]
    fn test_currency_marker() {
        assert!(classifier().looks_like_menu("Hovězí guláš, knedlík 149 Kč", &[]));
        assert!(classifier().looks_like_menu("Kuřecí řízek ........ 139,-", &[]));
    }

    #[test]
    fn test_category_word() {
        assert!(classifier().looks_like_menu("Polévka: frankfurtská s chlebem", &[]));
        assert!(classifier().looks_like_menu("Today: SOUP of the day and bread", &[]));
    }

    #[test]
    fn test_price_pattern() {
        let config = HeuristicsConfig { menu_keywords: Vec::new(), ..Default::default() };
        let classifier = MenuClassifier::new(&config).unwrap();

        assert!(classifier.looks_like_menu("Svíčková na smetaně 185 CZK", &[]));
        assert!(!classifier.looks_like_menu("Otevřeno denně od 11 do 22 hodin", &[]));
    }

    #[test]
    fn test_plain_text_is_not_menu() {
        assert!(!classifier().looks_like_menu("Welcome to our restaurant. Book a table online.", &[]));
    }

    #[test]
    fn test_short_text_is_not_menu() {
        assert!(!classifier().looks_like_menu("99 Kč", &[]));
        assert!(!classifier().looks_like_menu("", &[]));
    }

    #[test]
    fn test_invalid_price_pattern() {
        let config = HeuristicsConfig { price_pattern: "(unclosed".into(), ..Default::default() };
        assert!(matches!(MenuClassifier::new(&config), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_classify_fetch_result() {
        let result = FetchResult { text: "Dezert: jablečný štrúdl".into(), images: Vec::new() };
        assert!(classifier().classify(&result));
        assert!(!classifier().classify(&FetchResult::default()));
    }
}
