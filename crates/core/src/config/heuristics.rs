//! Menu detection policy.
//!
//! Keyword lists and length bounds used to decide whether a page holds menu
//! content. They are plain data so they can be tuned from config or swapped in
//! tests without touching the fetch logic.

use serde::{Deserialize, Serialize};

/// Tunable menu-detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    /// Case-insensitive substrings that mark priced menu text: currency
    /// markers and dish category words.
    pub menu_keywords: Vec<String>,

    /// Regular expression matching a price (number followed by a currency).
    pub price_pattern: String,

    /// Text shorter than this (in chars) never counts as menu content on its own.
    pub min_text_chars: usize,

    /// Case-insensitive id/class substrings that mark a menu section.
    pub section_markers: Vec<String>,

    /// Case-insensitive substrings in an image's src/alt/title that mark a menu image.
    pub image_keywords: Vec<String>,

    /// Upper bound on how many scored sections are placed ahead of the body text.
    pub max_sections: usize,

    /// Upper bound (in chars) on the text taken from a single scored section.
    pub max_section_chars: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            menu_keywords: strings(&[
                "kč",
                "czk",
                ",-",
                "€",
                "polévka",
                "polevka",
                "hlavní jídlo",
                "hlavni jidlo",
                "denní menu",
                "denni menu",
                "polední menu",
                "poledni menu",
                "soup",
                "main course",
                "dessert",
                "dezert",
            ]),
            price_pattern: r"(?i)\b\d{2,4}(?:[.,]\d{1,2})?\s*(?:kč|czk|eur|€|,-)".to_string(),
            min_text_chars: 10,
            section_markers: strings(&[
                "menu", "denni", "daily", "lunch", "obed", "poledni", "food", "dish", "meal", "jidl", "nabidk",
            ]),
            image_keywords: strings(&[
                "menu",
                "jidelni",
                "jídelní",
                "denni",
                "denní",
                "obed",
                "oběd",
                "poledni",
                "polední",
                "lunch",
                "tydenni",
                "týdenní",
                "speisekarte",
                "mittag",
            ]),
            max_sections: 5,
            max_section_chars: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keywords_are_lowercase() {
        let cfg = HeuristicsConfig::default();
        for kw in cfg.menu_keywords.iter().chain(&cfg.section_markers).chain(&cfg.image_keywords) {
            assert_eq!(kw, &kw.to_lowercase(), "keyword {kw} must be lowercase");
        }
    }

    #[test]
    fn test_default_price_pattern_compiles() {
        let cfg = HeuristicsConfig::default();
        let re = regex::Regex::new(&cfg.price_pattern).unwrap();
        assert!(re.is_match("Svíčková 159 Kč"));
        assert!(re.is_match("Gulášovka 45,-"));
        assert!(re.is_match("Schnitzel 12.50 EUR"));
        assert!(!re.is_match("Otevřeno 11-14 hod"));
    }
}
