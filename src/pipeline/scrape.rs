//! The two scrape stages.
//!
//! [`web_scraper`] fetches the page once and produces text plus generic
//! image links. [`png_crawler`] fetches it again (with retries) and keeps
//! only PNG links, recording them in a temporary manifest. Both degrade
//! instead of failing.

use crate::config::ReaderConfig;
use crate::output::{timestamp_now, PngManifest, PngScrapeResult, ScrapeCache, ScrapeResult};
use crate::pipeline::fetch::{fetch_with_retry, is_http_url, PageFetcher};
use crate::pipeline::html;
use crate::pipeline::images::{
    collect_image_urls, collect_png_urls, find_figure_references, is_arxiv_url,
};
use crate::prompts;
use crate::report::write_json_pretty;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// File name of the scrape cache in the work directory.
pub const SCRAPE_CACHE_FILE: &str = "scraped_data.json";

/// Figure references logged when an arXiv page yields no image links.
const LOGGED_FIGURE_REFERENCES: usize = 5;

/// `temp_images_<YYYYMMDD_HHMMSS>.json` for the current local time.
pub fn manifest_file_name() -> String {
    format!(
        "temp_images_{}.json",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Generic scrape: page text and filtered image links.
///
/// A failed fetch yields `爬取失败：<error>` as the text and no images.
pub async fn web_scraper(
    fetcher: &dyn PageFetcher,
    url: &str,
    config: &ReaderConfig,
) -> ScrapeResult {
    let timeout = Duration::from_secs(config.scrape_timeout_secs);
    let page = match fetcher.fetch(url, timeout).await {
        Ok(page) => page,
        Err(e) => {
            warn!("scrape of {} failed: {}", url, e);
            return ScrapeResult {
                scraped_text: prompts::scrape_failed(&e),
                image_urls: Vec::new(),
            };
        }
    };

    let parsed = html::parse_page(&page.body);
    let image_urls = collect_image_urls(url, &parsed.image_sources, config.max_images);
    info!(
        "scraped {} chars, {} image links",
        parsed.text.chars().count(),
        image_urls.len()
    );

    if image_urls.is_empty() && is_arxiv_url(url) {
        let refs = find_figure_references(&parsed.text);
        if !refs.is_empty() {
            let shown = &refs[..refs.len().min(LOGGED_FIGURE_REFERENCES)];
            info!(
                "no image links; page mentions {} figures, e.g. {:?}",
                refs.len(),
                shown
            );
        }
    }

    if config.write_scrape_cache {
        let cache = ScrapeCache {
            url: url.to_string(),
            text_content: parsed.text.clone(),
            image_urls: image_urls.clone(),
            timestamp: timestamp_now(),
        };
        let path = config.work_dir.join(SCRAPE_CACHE_FILE);
        if let Err(e) = write_json_pretty(&path, &cache).await {
            warn!("could not write scrape cache: {}", e);
        }
    }

    ScrapeResult {
        scraped_text: parsed.text,
        image_urls,
    }
}

/// PNG-only scrape with retries, plus the temporary manifest.
///
/// Non-HTTP input and exhausted retries both yield
/// [`PngScrapeResult::empty`]. A manifest that cannot be written leaves
/// `temp_filename` unset but keeps the links.
pub async fn png_crawler(
    fetcher: &dyn PageFetcher,
    url: &str,
    config: &ReaderConfig,
) -> PngScrapeResult {
    if !is_http_url(url) {
        warn!("not an HTTP(S) URL, skipping PNG scrape: {}", url);
        return PngScrapeResult::empty();
    }

    let timeout = Duration::from_secs(config.png_timeout_secs);
    let page = match fetch_with_retry(fetcher, url, timeout, &config.png_retry).await {
        Ok(page) => page,
        Err(e) => {
            warn!(
                "PNG scrape of {} failed after {} attempts: {}",
                url, config.png_retry.max_attempts, e
            );
            return PngScrapeResult::empty();
        }
    };

    let sources = html::parse_page(&page.body).image_sources;
    let png_images = collect_png_urls(url, &sources, config.max_png_images);
    info!("found {} PNG images", png_images.len());

    let manifest = PngManifest::new(url, &png_images);
    let path: PathBuf = config.work_dir.join(manifest_file_name());
    let temp_filename = match write_json_pretty(&path, &manifest).await {
        Ok(()) => {
            info!("PNG manifest written to {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("could not write PNG manifest: {}", e);
            None
        }
    };

    PngScrapeResult {
        png_images,
        temp_filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::error::PaperReaderError;
    use crate::pipeline::fetch::FetchedPage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves `body` for every URL, or fails when `body` is None.
    struct StaticFetcher {
        body: Option<&'static str>,
        calls: AtomicU32,
    }

    impl StaticFetcher {
        fn serving(body: &'static str) -> Self {
            Self {
                body: Some(body),
                calls: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                body: None,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(
            &self,
            url: &str,
            _timeout: Duration,
        ) -> Result<FetchedPage, PaperReaderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(body) => Ok(FetchedPage {
                    url: url.to_string(),
                    status: 200,
                    body: body.to_string(),
                }),
                None => Err(PaperReaderError::Network {
                    url: url.to_string(),
                    reason: "HTTP 404 Not Found".into(),
                }),
            }
        }
    }

    fn config_in(dir: &std::path::Path) -> ReaderConfig {
        ReaderConfig::builder()
            .work_dir(dir)
            .png_retry(RetryPolicy::immediate(3))
            .build()
            .unwrap()
    }

    const PAGE: &str = r#"<html><head><title>T</title><script>x()</script></head>
        <body><p>Paper body</p><img src="fig1.png"><img src="logo.png"><img src="x2.png"><img src="fig1.png"></body></html>"#;

    #[tokio::test]
    async fn scraper_collects_text_images_and_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::serving(PAGE);
        let out = web_scraper(&fetcher, "https://example.com/paper/", &config_in(tmp.path())).await;

        assert!(out.scraped_text.contains("Paper body"));
        assert!(!out.scraped_text.contains("x()"));
        assert_eq!(
            out.image_urls,
            vec![
                "https://example.com/paper/fig1.png",
                "https://example.com/paper/x2.png",
            ]
        );

        let cache: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(tmp.path().join(SCRAPE_CACHE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(cache["url"], "https://example.com/paper/");
        assert_eq!(cache["image_urls"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn scraper_failure_becomes_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let out = web_scraper(
            &StaticFetcher::failing(),
            "https://example.com/missing",
            &config_in(tmp.path()),
        )
        .await;
        assert!(out.scraped_text.starts_with("爬取失败："));
        assert!(out.image_urls.is_empty());
        assert!(!tmp.path().join(SCRAPE_CACHE_FILE).exists());
    }

    #[tokio::test]
    async fn scrape_cache_can_be_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ReaderConfig::builder()
            .work_dir(tmp.path())
            .write_scrape_cache(false)
            .build()
            .unwrap();
        web_scraper(&StaticFetcher::serving(PAGE), "https://e.com/p", &config).await;
        assert!(!tmp.path().join(SCRAPE_CACHE_FILE).exists());
    }

    #[tokio::test]
    async fn png_crawler_writes_manifest_in_first_seen_order() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::serving(PAGE);
        let out = png_crawler(&fetcher, "https://arxiv.org/html/2301.00001v1", &config_in(tmp.path())).await;

        assert_eq!(
            out.png_images,
            vec![
                "https://arxiv.org/html/2301.00001v1/fig1.png",
                "https://arxiv.org/html/2301.00001v1/logo.png",
                "https://arxiv.org/html/2301.00001v1/x2.png",
            ]
        );
        let manifest_path = out.temp_filename.expect("manifest written");
        assert!(manifest_path.starts_with(tmp.path()));
        let name = manifest_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("temp_images_") && name.ends_with(".json"));

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["image_count"], 3);
        assert_eq!(manifest["image_details"][2]["filename"], "x2.png");
    }

    #[tokio::test]
    async fn png_crawler_rejects_non_http_input_without_fetching() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::serving(PAGE);
        let out = png_crawler(&fetcher, "arxiv.org/abs/2301.00001", &config_in(tmp.path())).await;
        assert_eq!(out, PngScrapeResult::empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn png_crawler_gives_up_after_retries() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::failing();
        let out = png_crawler(&fetcher, "https://e.com/p", &config_in(tmp.path())).await;
        assert_eq!(out, PngScrapeResult::empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn manifest_name_format() {
        let name = manifest_file_name();
        // temp_images_YYYYMMDD_HHMMSS.json
        assert_eq!(name.len(), "temp_images_".len() + 15 + ".json".len());
    }
}
