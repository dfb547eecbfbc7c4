//! # paper-reader
//!
//! Read a research paper from its web page and produce a structured Chinese
//! summary, a JSON record and a static HTML report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Scrape     visible text + generic image links (10 s, one attempt)
//!  ├─ 2. PNG scrape PNG links only (15 s, 3 attempts) + temp manifest
//!  ├─ 3. Summarize  first 5000 chars → qwen-plus (or any edgequake-llm provider)
//!  ├─ 4. Title      arXiv id / text heuristics / <title> → file stem
//!  ├─ 5. Output     paper_output/<title>.json + <title>.html
//!  └─ 6. Cleanup    delete the temp manifest
//! ```
//!
//! No stage stops the run. A page that cannot be fetched still yields a
//! report, with `爬取失败` in the text and a sentinel summary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper_reader::{generate_paper_introduction, ReaderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint and key from QWEN_BASE_URL / QWEN_API_KEY
//!     let config = ReaderConfig::default();
//!     let summary =
//!         generate_paper_introduction("https://arxiv.org/abs/1706.03762", &config).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```
//!
//! For the output paths and the full record, build a [`PaperReader`] and
//! call [`PaperReader::run`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper-reader` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper-reader = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! | Setting | Backend |
//! |---------|---------|
//! | nothing | `qwen-plus` on DashScope compatible mode |
//! | `base_url` + `model` | any OpenAI-compatible server (vLLM, LM Studio, …) |
//! | `provider_name` | edgequake-llm provider: `openai`, `anthropic`, `gemini`, `ollama`, … |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod reader;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ReaderConfig, ReaderConfigBuilder, RetryPolicy};
pub use error::PaperReaderError;
pub use output::{PaperRecord, PaperReport, ReadOutcome};
pub use pipeline::fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use pipeline::llm::{ChatModel, ChatOptions, ChatTurn, ProviderModel};
pub use progress::{NoopProgressCallback, ProgressCallback, ReadProgressCallback, Stage};
pub use reader::{generate_paper_introduction, generate_paper_introduction_sync, PaperReader};
