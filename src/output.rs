//! Pipeline record, per-stage partial results and serialised artifacts.
//!
//! One [`PaperRecord`] exists per run. Stages never touch it directly: each
//! returns its own small result type which the orchestrator folds in with an
//! `apply_*` method, so the record only ever changes in one place.

use crate::prompts::UNKNOWN_TITLE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Local timestamp in the `YYYY-MM-DD HH:MM:SS.ffffff` form used by every
/// artifact.
pub fn timestamp_now() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

// ── Pipeline record ──────────────────────────────────────────────────────

/// State threaded through every stage of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Input URL, never modified.
    pub content_url: String,
    /// Visible page text, or a `爬取失败：…` marker.
    pub scraped_text: String,
    /// Generic-pass image links.
    pub image_urls: Vec<String>,
    /// PNG-pass image links, first-seen order.
    pub png_images: Vec<String>,
    /// Model output or sentinel.
    pub text_summary: String,
    /// Sanitised title, used as output file stem.
    pub paper_title: String,
    /// Temporary PNG manifest, removed at the end of the run.
    pub temp_filename: Option<PathBuf>,
}

impl PaperRecord {
    pub fn new(content_url: impl Into<String>) -> Self {
        Self {
            content_url: content_url.into(),
            scraped_text: String::new(),
            image_urls: Vec::new(),
            png_images: Vec::new(),
            text_summary: String::new(),
            paper_title: UNKNOWN_TITLE.to_string(),
            temp_filename: None,
        }
    }

    pub fn apply_scrape(&mut self, result: ScrapeResult) {
        self.scraped_text = result.scraped_text;
        self.image_urls = result.image_urls;
    }

    pub fn apply_png_scrape(&mut self, result: PngScrapeResult) {
        self.png_images = result.png_images;
        self.temp_filename = result.temp_filename;
    }

    pub fn apply_summary(&mut self, result: SummaryResult) {
        self.text_summary = result.text_summary;
    }

    pub fn apply_title(&mut self, title: String) {
        self.paper_title = title;
    }

    /// Final JSON artifact for this record.
    pub fn to_report(&self) -> PaperReport {
        PaperReport {
            url: self.content_url.clone(),
            summary: self.text_summary.clone(),
            image_count: self.image_urls.len(),
            png_image_count: self.png_images.len(),
            total_images: self.image_urls.len() + self.png_images.len(),
            image_urls: self.image_urls.clone(),
            png_images: self.png_images.clone(),
            timestamp: timestamp_now(),
        }
    }
}

// ── Stage results ────────────────────────────────────────────────────────

/// Output of the generic scrape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeResult {
    pub scraped_text: String,
    pub image_urls: Vec<String>,
}

/// Output of the PNG-only scrape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PngScrapeResult {
    pub png_images: Vec<String>,
    pub temp_filename: Option<PathBuf>,
}

impl PngScrapeResult {
    /// `{png_images: [], temp_filename: None}`.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Output of the summariser.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResult {
    pub text_summary: String,
}

// ── Artifacts ────────────────────────────────────────────────────────────

/// `scraped_data.json`, written after a successful generic scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeCache {
    pub url: String,
    pub text_content: String,
    pub image_urls: Vec<String>,
    pub timestamp: String,
}

/// `temp_images_<ts>.json`, describing the PNG scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PngManifest {
    pub url: String,
    pub png_images: Vec<String>,
    pub image_count: usize,
    pub crawl_time: String,
    pub image_details: Vec<PngImageDetail>,
}

/// One entry of [`PngManifest::image_details`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PngImageDetail {
    /// 1-based position in `png_images`.
    pub index: usize,
    pub url: String,
    pub filename: String,
    /// Always `"pending"`; nothing downloads the images.
    pub status: String,
}

impl PngManifest {
    pub fn new(url: &str, png_images: &[String]) -> Self {
        let image_details = png_images
            .iter()
            .enumerate()
            .map(|(i, img)| PngImageDetail {
                index: i + 1,
                url: img.clone(),
                filename: url_basename(img).to_string(),
                status: "pending".to_string(),
            })
            .collect();

        Self {
            url: url.to_string(),
            png_images: png_images.to_vec(),
            image_count: png_images.len(),
            crawl_time: timestamp_now(),
            image_details,
        }
    }
}

/// `<title>.json` in the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperReport {
    pub url: String,
    pub summary: String,
    pub image_count: usize,
    pub png_image_count: usize,
    pub total_images: usize,
    pub image_urls: Vec<String>,
    pub png_images: Vec<String>,
    pub timestamp: String,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReadOutcome {
    pub record: PaperRecord,
    /// `None` when the JSON artifact could not be written.
    pub json_path: Option<PathBuf>,
    /// `None` when the HTML report could not be written.
    pub html_path: Option<PathBuf>,
    pub duration_ms: u64,
}

impl ReadOutcome {
    pub fn summary(&self) -> &str {
        &self.record.text_summary
    }
}

/// Last `/`-separated segment of a URL.
pub(crate) fn url_basename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
