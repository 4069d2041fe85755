//! Menu image detection.

use lunchbox_core::HeuristicsConfig;
use scraper::{ElementRef, Html};
use url::Url;

/// Attributes lazy-loading scripts use to hold the real image source.
const LAZY_SRC_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-original"];

/// Find images whose source, alt text or title mention a menu.
///
/// Lazy-load attributes win over `src`, which often holds a placeholder.
/// Relative URLs are resolved against `base_url`; inline `data:` images and
/// unresolvable sources are skipped. Document order is preserved.
pub fn extract_images(html: &str, base_url: &Url, heuristics: &HeuristicsConfig) -> Vec<String> {
    images_from_document(&Html::parse_document(html), base_url, heuristics)
}

pub(crate) fn images_from_document(document: &Html, base_url: &Url, heuristics: &HeuristicsConfig) -> Vec<String> {
    let keywords: Vec<String> = heuristics
        .image_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "img")
        .filter_map(|img| menu_image_url(img, base_url, &keywords))
        .collect()
}

fn menu_image_url(img: ElementRef<'_>, base_url: &Url, keywords: &[String]) -> Option<String> {
    let el = img.value();

    let lazy = LAZY_SRC_ATTRS.iter().filter_map(|attr| el.attr(attr)).find(|v| !v.trim().is_empty());
    let src = lazy.or_else(|| el.attr("src")).map(str::trim).filter(|s| !s.is_empty())?;

    let mut haystack = String::new();
    for attr in ["src", "data-src", "data-lazy-src", "data-original", "alt", "title"] {
        if let Some(value) = el.attr(attr) {
            haystack.push_str(&value.to_lowercase());
            haystack.push(' ');
        }
    }
    if !keywords.iter().any(|k| haystack.contains(k.as_str())) {
        return None;
    }

    if src.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:")) {
        return None;
    }

    match base_url.join(src) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(e) => {
            tracing::debug!(src, "skipping unresolvable image: {e}");
            None
        }
    }
}
