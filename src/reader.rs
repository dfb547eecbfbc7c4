//! Orchestrator: runs every stage for one URL.
//!
//! ```text
//! scrape ──▶ PNG scrape ──▶ summarize ──▶ title ──▶ JSON ──▶ HTML ──▶ cleanup
//! ```
//!
//! Stages run strictly one after another. None of them can abort the run:
//! a failed stage hands the next one degraded data (empty lists, sentinel
//! strings), failed writes leave `None` paths in the [`ReadOutcome`], and a
//! manifest that cannot be deleted is only logged.

use crate::config::ReaderConfig;
use crate::error::PaperReaderError;
use crate::output::{PaperRecord, ReadOutcome};
use crate::pipeline::fetch::{HttpFetcher, PageFetcher};
use crate::pipeline::llm::{resolve_chat_model, ChatModel};
use crate::pipeline::{scrape, summarize, title};
use crate::progress::{ReadProgressCallback, Stage};
use crate::prompts::{EMPTY_RESPONSE, MODEL_FAILED_PREFIX, SCRAPE_FAILED_MARKER, SUMMARY_SKIPPED};
use crate::report;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Reads papers: owns the configuration and both injected clients.
pub struct PaperReader {
    config: ReaderConfig,
    fetcher: Arc<dyn PageFetcher>,
    model: Arc<dyn ChatModel>,
}

impl PaperReader {
    /// Build a reader from explicit dependencies.
    pub fn new(config: ReaderConfig, fetcher: Arc<dyn PageFetcher>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            config,
            fetcher,
            model,
        }
    }

    /// Build a reader with an [`HttpFetcher`] and the chat model chosen by
    /// [`resolve_chat_model`].
    ///
    /// # Errors
    /// Fails when the HTTP client or the named LLM provider cannot be set up.
    pub fn from_config(config: ReaderConfig) -> Result<Self, PaperReaderError> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.user_agent)?);
        let model = resolve_chat_model(&config)?;
        Ok(Self::new(config, fetcher, model))
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    fn notify(&self, event: impl FnOnce(&dyn ReadProgressCallback)) {
        if let Some(ref cb) = self.config.progress_callback {
            event(cb.as_ref());
        }
    }

    /// Run the whole pipeline for `url`.
    pub async fn run(&self, url: &str) -> ReadOutcome {
        let start = Instant::now();
        let config = &self.config;
        let fetcher = self.fetcher.as_ref();
        info!("Reading paper: {}", url);
        self.notify(|cb| cb.on_run_start(url));

        let mut record = PaperRecord::new(url);

        // ── Step 1: Generic scrape ───────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::Scrape));
        record.apply_scrape(scrape::web_scraper(fetcher, url, config).await);
        if record.scraped_text.contains(SCRAPE_FAILED_MARKER) {
            self.notify(|cb| cb.on_stage_degraded(Stage::Scrape, &record.scraped_text));
        } else {
            let detail = format!(
                "{} chars, {} images",
                record.scraped_text.chars().count(),
                record.image_urls.len()
            );
            self.notify(|cb| cb.on_stage_complete(Stage::Scrape, &detail));
        }

        // ── Step 2: PNG scrape ───────────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::PngScrape));
        record.apply_png_scrape(scrape::png_crawler(fetcher, url, config).await);
        if record.temp_filename.is_none() {
            self.notify(|cb| cb.on_stage_degraded(Stage::PngScrape, "no PNG manifest"));
        } else {
            let detail = format!("{} PNG images", record.png_images.len());
            self.notify(|cb| cb.on_stage_complete(Stage::PngScrape, &detail));
        }

        // ── Step 3: Summary ──────────────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::Summarize));
        let summary = summarize::summarize(self.model.as_ref(), &record.scraped_text, config).await;
        record.apply_summary(summary);
        if is_degraded_summary(&record.text_summary) {
            self.notify(|cb| cb.on_stage_degraded(Stage::Summarize, &record.text_summary));
        } else {
            let detail = format!("{} chars", record.text_summary.chars().count());
            self.notify(|cb| cb.on_stage_complete(Stage::Summarize, &detail));
        }

        // ── Step 4: Title ────────────────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::Title));
        let paper_title = title::extract_paper_title(
            fetcher,
            &record.scraped_text,
            url,
            Duration::from_secs(config.title_timeout_secs),
        )
        .await;
        record.apply_title(paper_title);
        self.notify(|cb| cb.on_stage_complete(Stage::Title, &record.paper_title));

        // ── Step 5: JSON report ──────────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::WriteJson));
        let json_path = match report::write_json_report(
            &config.output_dir,
            &record.paper_title,
            &record.to_report(),
        )
        .await
        {
            Ok(path) => {
                info!("JSON report saved to {}", path.display());
                self.notify(|cb| cb.on_stage_complete(Stage::WriteJson, &path.display().to_string()));
                Some(path)
            }
            Err(e) => {
                warn!("could not write JSON report: {}", e);
                self.notify(|cb| cb.on_stage_degraded(Stage::WriteJson, &e.to_string()));
                None
            }
        };

        // ── Step 6: HTML report ──────────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::WriteHtml));
        let html_path = match report::write_html_report(
            &config.output_dir,
            &record,
            config,
            self.model.model_name(),
        )
        .await
        {
            Ok(path) => {
                info!("HTML report saved to {}", path.display());
                self.notify(|cb| cb.on_stage_complete(Stage::WriteHtml, &path.display().to_string()));
                Some(path)
            }
            Err(e) => {
                warn!("could not write HTML report: {}", e);
                self.notify(|cb| cb.on_stage_degraded(Stage::WriteHtml, &e.to_string()));
                None
            }
        };

        // ── Step 7: Remove the temporary manifest ────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::Cleanup));
        match record.temp_filename.as_deref() {
            Some(path) => match remove_temp_manifest(path).await {
                Ok(()) => {
                    info!("removed temporary file {}", path.display());
                    self.notify(|cb| cb.on_stage_complete(Stage::Cleanup, "manifest removed"));
                }
                Err(e) => {
                    warn!("{}", e);
                    self.notify(|cb| cb.on_stage_degraded(Stage::Cleanup, &e.to_string()));
                }
            },
            None => self.notify(|cb| cb.on_stage_complete(Stage::Cleanup, "nothing to remove")),
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Finished {} in {}ms", url, duration_ms);
        self.notify(|cb| cb.on_run_complete(record.text_summary.chars().count()));

        ReadOutcome {
            record,
            json_path,
            html_path,
            duration_ms,
        }
    }
}

fn is_degraded_summary(summary: &str) -> bool {
    summary == SUMMARY_SKIPPED || summary == EMPTY_RESPONSE || summary.starts_with(MODEL_FAILED_PREFIX)
}

/// Delete the temporary PNG manifest.
pub async fn remove_temp_manifest(path: &Path) -> Result<(), PaperReaderError> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| PaperReaderError::ArtifactRemoveFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Read the paper at `url` and return its summary.
///
/// All artifacts are still written. The only errors are construction
/// errors from [`PaperReader::from_config`]; once the pipeline starts, the
/// result is always `Ok` (possibly holding a sentinel summary).
pub async fn generate_paper_introduction(
    url: &str,
    config: &ReaderConfig,
) -> Result<String, PaperReaderError> {
    let reader = PaperReader::from_config(config.clone())?;
    let outcome = reader.run(url).await;
    Ok(outcome.record.text_summary)
}

/// Synchronous wrapper around [`generate_paper_introduction`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_paper_introduction_sync(
    url: &str,
    config: &ReaderConfig,
) -> Result<String, PaperReaderError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PaperReaderError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_paper_introduction(url, config))
}
