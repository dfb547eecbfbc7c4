//! Pipeline stages for reading one paper page.
//!
//! Each submodule implements one step and degrades instead of failing, so
//! the orchestrator in [`crate::reader`] can run them back to back without
//! any error plumbing.
//!
//! ## Data Flow
//!
//! ```text
//!          ┌──▶ scrape::web_scraper ──▶ text + generic images ──┐
//! URL ──▶ fetch                                                  ├──▶ summarize ──▶ title ──▶ report
//!          └──▶ scrape::png_crawler ──▶ PNG images + manifest ──┘       (llm)
//! ```
//!
//! 1. [`fetch`]: GET with browser headers and a timeout; fixed-delay retry
//!    for the PNG pass only
//! 2. [`html`]: visible text, `img` sources, `<title>`
//! 3. [`images`]: the generic and PNG-only link filters
//! 4. [`scrape`]: the two scrape stages built from the three above
//! 5. [`summarize`]: truncation, skip rules, one [`llm`] call
//! 6. [`title`]: arXiv id, text heuristics, `<title>` fallback, sanitising

pub mod fetch;
pub mod html;
pub mod images;
pub mod llm;
pub mod scrape;
pub mod summarize;
pub mod title;
