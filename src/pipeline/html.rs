//! HTML parsing and text linearisation.
//!
//! A page is parsed once into a [`ParsedPage`] holding only owned data
//! (text, `img` sources, `<title>`), so no DOM handle outlives the call and
//! nothing non-`Send` is held across an `.await` by the callers.
//!
//! The parser is html5ever via `scraper`: it accepts any input, so there is
//! no parse-error path here.

use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Owned extraction result of one HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Linearised visible text (see [`linearize_text`]).
    pub text: String,
    /// Non-empty `src` attributes of every `img`, in document order.
    pub image_sources: Vec<String>,
    /// Trimmed text of the first `<title>`, if any.
    pub title: Option<String>,
}

/// Parse `html` and extract text, image sources and title in one pass.
pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    ParsedPage {
        text: linearize_text(&visible_text(&document)),
        image_sources: image_sources(&document),
        title: title_text(&document),
    }
}

/// Parse `html` and return only its `<title>` text.
pub fn page_title(html: &str) -> Option<String> {
    title_text(&Html::parse_document(html))
}

/// Concatenate every text node outside `script` / `style`.
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    collect_visible_text(document.root_element(), &mut out);
    out
}

fn collect_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(element) => {
                // script/style text is never visible content
                if matches!(element.name(), "script" | "style") {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_visible_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Flatten raw page text into a single line.
///
/// Split into lines, trim each, re-split on double-space runs, drop empty
/// fragments, join with single spaces. Headings and paragraphs are not
/// preserved.
pub fn linearize_text(raw: &str) -> String {
    raw.split(is_line_break)
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every character that starts a new line in Unicode-aware line splitting.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{1C}' | '\u{1D}' | '\u{1E}' | '\u{85}' | '\u{2028}'
            | '\u{2029}'
    )
}

/// Non-empty `src` of every `img`, in document order.
pub fn image_sources(document: &Html) -> Vec<String> {
    document
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trimmed text of the first `<title>` element.
pub fn title_text(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}
