//! Menu content extraction from HTML.
//!
//! ### Text
//! - Drops `script`, `style`, `noscript` and `template` subtrees.
//! - Scores container elements (`div`, `section`, `article`, `main`, lists,
//!   tables) by menu markers in their `id`/`class`; structural containers get
//!   a bonus. The best non-overlapping sections, each capped in length, are
//!   placed ahead of the full body text.
//! - Whitespace is collapsed per line and blank lines are dropped.
//!
//! ### Images
//! - See [`images::extract_images`].

pub mod classify;
pub mod images;

pub use classify::MenuClassifier;
pub use images::extract_images;

use lunchbox_core::HeuristicsConfig;
use scraper::{ElementRef, Html, Node};
use url::Url;

/// Elements whose text is never page content.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that may hold a menu section.
const CANDIDATE_TAGS: &[&str] = &["div", "section", "article", "main", "ul", "ol", "table"];

/// Candidates that are content containers by construction.
const STRUCTURAL_TAGS: &[&str] = &["section", "article", "main"];

/// Elements that start a new line in the extracted text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "aside", "nav", "ul", "ol", "li", "table", "tr",
    "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "br", "dl", "dt", "dd", "figure", "figcaption", "pre",
    "blockquote",
];

const MARKER_WEIGHT: i32 = 10;
const STRUCTURAL_BONUS: i32 = 5;

/// Text and candidate menu images produced by one fetch attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    /// Normalized page text, scored sections first.
    pub text: String,

    /// Absolute URLs of images that look like menus, in document order.
    pub images: Vec<String>,
}

impl FetchResult {
    /// Extract both text and images from a document.
    pub fn from_html(html: &str, base_url: &Url, heuristics: &HeuristicsConfig) -> Self {
        let document = Html::parse_document(html);
        Self {
            text: text_from_document(&document, heuristics),
            images: images::images_from_document(&document, base_url, heuristics),
        }
    }
}

/// Reduce a document to one normalized text blob.
pub fn extract_text(html: &str, heuristics: &HeuristicsConfig) -> String {
    text_from_document(&Html::parse_document(html), heuristics)
}

fn text_from_document(document: &Html, heuristics: &HeuristicsConfig) -> String {
    let root = document.root_element();
    let body = root.children().filter_map(ElementRef::wrap).find(|e| e.value().name() == "body").unwrap_or(root);

    let mut parts: Vec<String> = top_sections(body, heuristics)
        .into_iter()
        .map(|section| truncate_chars(&normalize_whitespace(&raw_text(section)), heuristics.max_section_chars))
        .filter(|text| !text.is_empty())
        .collect();

    let body_text = normalize_whitespace(&raw_text(body));
    if !body_text.is_empty() {
        parts.push(body_text);
    }

    parts.join("\n\n")
}

/// Score every candidate and pick the best sections that do not contain one another.
fn top_sections<'a>(body: ElementRef<'a>, heuristics: &HeuristicsConfig) -> Vec<ElementRef<'a>> {
    if heuristics.max_sections == 0 {
        return Vec::new();
    }

    let markers: Vec<String> = heuristics.section_markers.iter().map(|m| m.to_lowercase()).collect();

    let mut scored: Vec<(i32, ElementRef<'a>)> = body
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| CANDIDATE_TAGS.contains(&e.value().name()))
        .filter(|e| !in_skipped_subtree(*e))
        .filter_map(|e| {
            let score = section_score(e, &markers);
            (score > 0).then_some((score, e))
        })
        .collect();

    // Stable: equal scores keep document order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut picked: Vec<ElementRef<'a>> = Vec::new();
    for (_, candidate) in scored {
        if picked.len() >= heuristics.max_sections {
            break;
        }
        let overlaps = picked.iter().any(|p| {
            candidate.ancestors().any(|a| a.id() == p.id()) || p.ancestors().any(|a| a.id() == candidate.id())
        });
        if !overlaps {
            picked.push(candidate);
        }
    }
    picked
}

fn section_score(element: ElementRef<'_>, markers: &[String]) -> i32 {
    let value = element.value();
    let mut haystack = value.id().unwrap_or_default().to_lowercase();
    for class in value.classes() {
        haystack.push(' ');
        haystack.push_str(&class.to_lowercase());
    }

    let hits = markers.iter().filter(|m| !m.is_empty() && haystack.contains(m.as_str())).count() as i32;
    if hits == 0 {
        return 0;
    }

    let bonus = if STRUCTURAL_TAGS.contains(&value.name()) { STRUCTURAL_BONUS } else { 0 };
    hits * MARKER_WEIGHT + bonus
}

fn in_skipped_subtree(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIPPED_TAGS.contains(&a.value().name()))
}

/// Concatenate text nodes, breaking lines at block elements.
fn raw_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else { continue };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_text(child_el, out);
                if block {
                    out.push('\n');
                } else if name == "td" || name == "th" {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Collapse runs of whitespace inside each line and drop empty lines.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristics() -> HeuristicsConfig {
        HeuristicsConfig::default()
    }

    #[test]
    fn test_extract_text_drops_scripts_and_styles() {
        let html = r#"
            <html>
                <head><title>Bistro</title><style>body { color: red; }</style></head>
                <body>
                    <script>var menu = "hidden";</script>
                    <noscript>Enable JavaScript</noscript>
                    <p>Polévka dne</p>
                </body>
            </html>
        "#;

        let text = extract_text(html, &heuristics());
        assert_eq!(text, "Polévka dne");
    }

    #[test]
    fn test_extract_text_collapses_whitespace() {
        let html = "<html><body><p>  Svíčková   na\tsmetaně  </p>\n\n<p>145 Kč</p></body></html>";

        let text = extract_text(html, &heuristics());
        assert_eq!(text, "Svíčková na smetaně\n145 Kč");
    }

    #[test]
    fn test_extract_text_places_menu_section_first() {
        let html = r#"
            <html><body>
                <div class="intro"><p>Vítejte v naší restauraci</p></div>
                <section id="denni-menu"><h2>Denní menu</h2><p>Guláš 139 Kč</p></section>
            </body></html>
        "#;

        let text = extract_text(html, &heuristics());
        assert!(text.starts_with("Denní menu\nGuláš 139 Kč\n\n"), "got {text:?}");
        assert!(text.ends_with("Vítejte v naší restauraci\nDenní menu\nGuláš 139 Kč"));
    }

    #[test]
    fn test_extract_text_skips_nested_sections() {
        let html = r#"
            <html><body>
                <section class="menu"><div class="menu-item">Řízek 159 Kč</div></section>
            </body></html>
        "#;

        let text = extract_text(html, &heuristics());
        assert_eq!(text.matches("Řízek 159 Kč").count(), 2, "one section copy plus the body");
    }

    #[test]
    fn test_extract_text_truncates_sections() {
        let config = HeuristicsConfig { max_section_chars: 5, ..heuristics() };
        let html = r#"<html><body><div id="lunch">Kuřecí steak</div></body></html>"#;

        let text = extract_text(html, &config);
        assert!(text.starts_with("Kuřec\n\n"), "got {text:?}");
    }

    #[test]
    fn test_extract_text_respects_max_sections() {
        let config = HeuristicsConfig { max_sections: 0, ..heuristics() };
        let html = r#"<html><body><div id="menu">Pizza</div></body></html>"#;

        assert_eq!(extract_text(html, &config), "Pizza");
    }

    #[test]
    fn test_extract_text_empty_document() {
        assert_eq!(extract_text("<html><body>   </body></html>", &heuristics()), "");
        assert_eq!(extract_text("", &heuristics()), "");
    }

    #[test]
    fn test_fetch_result_from_html() {
        let html = r#"
            <html><body>
                <p>Dnes vaříme</p>
                <img src="/img/denni-menu.jpg" alt="">
                <img src="/img/logo.png" alt="Logo">
            </body></html>
        "#;
        let base = Url::parse("https://bistro.example/obed").unwrap();

        let result = FetchResult::from_html(html, &base, &heuristics());
        assert_eq!(result.text, "Dnes vaříme");
        assert_eq!(result.images, vec!["https://bistro.example/img/denni-menu.jpg".to_string()]);
    }
}
