//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn ReadProgressCallback>`] via
//! [`crate::config::ReaderConfigBuilder::progress_callback`] to be told when
//! each stage of a run starts and finishes. The CLI uses it to drive a
//! spinner; library callers can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use paper_reader::{ReadProgressCallback, ReaderConfig, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     finished: AtomicUsize,
//! }
//!
//! impl ReadProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage, detail: &str) {
//!         self.finished.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} done: {}", stage, detail);
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { finished: AtomicUsize::new(0) });
//! let config = ReaderConfig::builder()
//!     .progress_callback(cb as Arc<dyn ReadProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// One step of the reading pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Scrape,
    PngScrape,
    Summarize,
    Title,
    WriteJson,
    WriteHtml,
    Cleanup,
}

impl Stage {
    /// All stages in the order the orchestrator runs them.
    pub const ALL: [Stage; 7] = [
        Stage::Scrape,
        Stage::PngScrape,
        Stage::Summarize,
        Stage::Title,
        Stage::WriteJson,
        Stage::WriteHtml,
        Stage::Cleanup,
    ];

    /// 1-indexed position of the stage.
    pub fn position(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scrape => "scraping page",
            Stage::PngScrape => "scraping PNG images",
            Stage::Summarize => "summarising",
            Stage::Title => "extracting title",
            Stage::WriteJson => "writing JSON",
            Stage::WriteHtml => "writing HTML",
            Stage::Cleanup => "cleaning up",
        };
        f.write_str(name)
    }
}

/// Called by the pipeline around each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Stages never overlap, but the trait is
/// `Send + Sync` so the callback can live in an `Arc` shared with other
/// tasks.
pub trait ReadProgressCallback: Send + Sync {
    /// Called once before the first stage.
    fn on_run_start(&self, url: &str) {
        let _ = url;
    }

    /// Called just before a stage runs.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage produced its normal result.
    ///
    /// `detail` is a short human-readable summary, e.g. `"12 images"`.
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called when a stage fell back to degraded data.
    fn on_stage_degraded(&self, stage: Stage, reason: &str) {
        let _ = (stage, reason);
    }

    /// Called once after the last stage.
    fn on_run_complete(&self, summary_len: usize) {
        let _ = summary_len;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReaderConfig`].
pub type ProgressCallback = Arc<dyn ReadProgressCallback>;
