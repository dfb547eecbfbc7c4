//! Paper-title heuristics and filename sanitisation.
//!
//! The title is only used to name the output files, so a stable identifier
//! beats a pretty one: an arXiv id from the URL wins outright, then a handful
//! of text patterns, then the page's `<title>` (arXiv only), then the
//! "未知论文" sentinel. Whatever comes out goes through [`sanitize_filename`].

use crate::pipeline::fetch::PageFetcher;
use crate::pipeline::html;
use crate::pipeline::images::is_arxiv_url;
use crate::prompts::{SCRAPE_FAILED_MARKER, UNKNOWN_TITLE};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum length of a sanitised title, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Maximum length of a sanitised title, in UTF-8 bytes. Leaves room for the
/// `.json.tmp` suffix under the 255-byte filename limit.
pub const MAX_TITLE_BYTES: usize = 240;

/// Lines of scraped text inspected by the text heuristics.
const SCANNED_LINES: usize = 10;

static ARXIV_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"/abs/(\d+\.\d+)", r"/html/(\d+\.\d+)", r"/(\d+\.\d+)v?\d*"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// A text heuristic; `whole_match` patterns have no capture group.
struct TitlePattern {
    re: Regex,
    whole_match: bool,
}

static TITLE_PATTERNS: Lazy<Vec<TitlePattern>> = Lazy::new(|| {
    [
        (r"(?i)Title[:\s]*([^\n\r]+)", false),
        (r"(?i)标题[:\s]*([^\n\r]+)", false),
        (r"(?i)^([A-Z][^.!?\n\r]{10,100})", false),
        (r"(?i)^([^.!?\n\r]{15,80})", false),
        (r"(?i)BannerAgency[^.!?\n\r]*", true),
        (r"(?i)GPT-[^.!?\n\r]*", true),
        (r"(?i)Attention[^.!?\n\r]*", true),
    ]
    .into_iter()
    .map(|(p, whole_match)| TitlePattern {
        re: Regex::new(p).unwrap(),
        whole_match,
    })
    .collect()
});

static RE_RESERVED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Make `name` safe as a file stem.
///
/// `<>:"/\|?*` become `_`, whitespace runs become one space, the result is
/// trimmed and cut to [`MAX_TITLE_CHARS`] characters and at most
/// [`MAX_TITLE_BYTES`] bytes, on a character boundary. Idempotent.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = RE_RESERVED_CHARS.replace_all(name, "_");
    let collapsed = RE_WHITESPACE.replace_all(&replaced, " ");

    let mut truncated = String::new();
    for c in collapsed.trim().chars().take(MAX_TITLE_CHARS) {
        if truncated.len() + c.len_utf8() > MAX_TITLE_BYTES {
            break;
        }
        truncated.push(c);
    }
    // the cut may land right after a space
    truncated.trim_end().to_string()
}

/// `arXiv_<id>` when `url` is an arxiv.org URL carrying a paper id.
pub fn arxiv_title_from_url(url: &str) -> Option<String> {
    if !is_arxiv_url(url) {
        return None;
    }
    ARXIV_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .map(|caps| {
            info!("arXiv id from URL: {}", &caps[1]);
            format!("arXiv_{}", &caps[1])
        })
}

/// Run the text heuristics over the first lines of `text`.
pub fn title_from_text(text: &str) -> Option<String> {
    for (i, line) in text.split('\n').take(SCANNED_LINES).enumerate() {
        let line = line.trim();
        debug!(
            "title candidate line {}: {}",
            i + 1,
            line.chars().take(50).collect::<String>()
        );

        let len = line.chars().count();
        if len <= 10 || len >= 200 {
            continue;
        }

        for pattern in TITLE_PATTERNS.iter() {
            let Some(caps) = pattern.re.captures(line) else {
                continue;
            };
            let matched = if pattern.whole_match {
                caps.get(0)
            } else {
                caps.get(1)
            };
            let candidate = matched.map(|m| m.as_str().trim()).unwrap_or("");
            if candidate.chars().count() > 5 {
                info!("title from text: {}", candidate);
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// `<title>` of the page at `url`, when it is a plausible paper title.
pub async fn title_from_page(
    fetcher: &dyn PageFetcher,
    url: &str,
    timeout: Duration,
) -> Option<String> {
    let page = match fetcher.fetch(url, timeout).await {
        Ok(page) => page,
        Err(e) => {
            warn!("title re-fetch failed: {}", e);
            return None;
        }
    };
    if page.status != 200 {
        return None;
    }

    let title = html::page_title(&page.body)?;
    let len = title.chars().count();
    if len > 5 && len < 200 {
        info!("title from <title> tag: {}", title);
        Some(title)
    } else {
        None
    }
}

/// Best-effort, filename-safe paper title.
///
/// Tries, in order: arXiv id in the URL, text heuristics, the page
/// `<title>` (arXiv URLs only), and finally [`UNKNOWN_TITLE`]. Text holding
/// the scrape-failure marker is not searched.
pub async fn extract_paper_title(
    fetcher: &dyn PageFetcher,
    text: &str,
    url: &str,
    timeout: Duration,
) -> String {
    let mut title = arxiv_title_from_url(url);

    if title.is_none() && !text.contains(SCRAPE_FAILED_MARKER) {
        title = title_from_text(text);
    }

    if title.is_none() && is_arxiv_url(url) {
        title = title_from_page(fetcher, url, timeout).await;
    }

    let sanitized = sanitize_filename(title.as_deref().unwrap_or(UNKNOWN_TITLE));
    if sanitized.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        info!("paper title: {}", sanitized);
        sanitized
    }
}
