//! Error types for the paper-reader library.
//!
//! The pipeline itself is *degrading*, not failing: every stage catches its
//! own errors and hands the next stage an empty list or a sentinel string.
//! [`PaperReaderError`] therefore shows up in two places only:
//!
//! * inside a stage, as the value that gets folded into degraded data
//!   (and logged), e.g. a fetch failure becoming the `爬取失败：…` marker;
//! * at construction time, when a [`crate::PaperReader`] cannot be built at
//!   all (bad configuration, HTTP client or provider initialisation failed).
//!
//! The variants are grouped by failure class: network, model, filesystem.
//! HTML parsing has no variant because the parser never rejects input.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the paper-reader library.
#[derive(Debug, Error)]
pub enum PaperReaderError {
    // ── Network errors ────────────────────────────────────────────────────
    /// The URL has no `http://` / `https://` scheme or cannot be parsed.
    #[error("Invalid URL '{url}': not a valid HTTP/HTTPS URL")]
    InvalidUrl { url: String },

    /// Transport failure or non-success HTTP status.
    #[error("Request to '{url}' failed: {reason}")]
    Network { url: String, reason: String },

    /// The request exceeded its timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The chat-completion endpoint returned an error.
    #[error("LLM API error: {message}")]
    ModelApi { message: String },

    /// The chat-completion endpoint answered without any content.
    #[error("LLM API returned an empty response")]
    EmptyResponse,

    /// The requested provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not delete an intermediate artifact.
    #[error("Failed to remove '{path}': {source}")]
    ArtifactRemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaperReaderError {
    /// True for errors raised while talking to a web server.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::Network { .. } | Self::Timeout { .. }
        )
    }

    /// True for errors raised by the chat model or its provider.
    pub fn is_model(&self) -> bool {
        matches!(
            self,
            Self::ModelApi { .. } | Self::EmptyResponse | Self::ProviderNotConfigured { .. }
        )
    }

    /// True for artifact write/delete failures.
    pub fn is_filesystem(&self) -> bool {
        matches!(
            self,
            Self::OutputWriteFailed { .. } | Self::ArtifactRemoveFailed { .. }
        )
    }
}
