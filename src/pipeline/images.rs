//! Image-link discovery.
//!
//! Two passes exist and are kept apart on purpose, because their rules
//! differ in observable ways:
//!
//! | | generic pass | PNG-only pass |
//! |---|---|---|
//! | filter | [`is_valid_image_url`] heuristics | `src` ends in `.png` |
//! | resolution | page URL, arXiv `/html/` special case | page URL + trailing `/` |
//! | ordering | sorted set | first seen |
//! | cap | `max_images` (100) | optional |

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use url::Url;

const IMAGE_EXTENSIONS: [&str; 7] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg"];
const IMAGE_PATH_HINTS: [&str; 6] = ["/image", "/img", "/picture", "/photo", "/figure", "/fig"];
const EXCLUDED_KEYWORDS: [&str; 5] = ["logo", "icon", "avatar", "button", "banner"];

static FIGURE_REFERENCES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)Figure\s+\d+", r"(?i)Fig\.\s*\d+", r"图\s*\d+", r"图表\s*\d+"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Does `url` look like a content image?
///
/// True when the lowercased URL contains an image extension or an image-ish
/// path segment, and none of the excluded keywords. Exclusion always wins.
pub fn is_valid_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    let has_ext = IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext));
    let has_path = IMAGE_PATH_HINTS.iter().any(|p| lower.contains(p));
    let excluded = EXCLUDED_KEYWORDS.iter().any(|k| lower.contains(k));
    (has_ext || has_path) && !excluded
}

/// True for pages hosted on arxiv.org.
pub fn is_arxiv_url(url: &str) -> bool {
    url.contains("arxiv.org")
}

fn join_url(base: &str, src: &str) -> Option<String> {
    Url::parse(base)
        .and_then(|b| b.join(src))
        .map(|u| u.to_string())
        .ok()
}

/// Resolve an `img` `src` the way the generic pass does.
pub fn resolve_generic_src(page_url: &str, src: &str) -> Option<String> {
    if is_arxiv_url(page_url) {
        if src.starts_with('/') && src.contains("/html/") {
            return Some(format!("https://arxiv.org{}", src));
        }
        if src.starts_with("http") {
            return Some(src.to_string());
        }
    }
    join_url(page_url, src)
}

/// Generic pass: resolve, filter with [`is_valid_image_url`], deduplicate,
/// cap at `max`.
pub fn collect_image_urls(page_url: &str, sources: &[String], max: usize) -> Vec<String> {
    let unique: BTreeSet<String> = sources
        .iter()
        .filter_map(|src| resolve_generic_src(page_url, src))
        .filter(|u| is_valid_image_url(u))
        .collect();
    unique.into_iter().take(max).collect()
}

/// PNG-only pass: `src` ending in `.png` (any case), resolved against the
/// page URL with a trailing slash, deduplicated in first-seen order.
pub fn collect_png_urls(page_url: &str, sources: &[String], max: Option<usize>) -> Vec<String> {
    let base = if page_url.ends_with('/') {
        page_url.to_string()
    } else {
        format!("{}/", page_url)
    };

    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|src| src.to_lowercase().ends_with(".png"))
        .filter_map(|src| join_url(&base, src))
        .filter(|u| seen.insert(u.clone()))
        .take(max.unwrap_or(usize::MAX))
        .collect()
}

/// Figure mentions ("Figure 1", "Fig. 2", "图 3", "图表 4") in page text.
pub fn find_figure_references(text: &str) -> Vec<String> {
    FIGURE_REFERENCES
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.as_str().to_string()))
        .collect()
}
