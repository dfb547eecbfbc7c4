//! Configuration types for a paper-reading run.
//!
//! All pipeline behaviour is controlled through [`ReaderConfig`], built via
//! its [`ReaderConfigBuilder`]. Timeouts, caps and model parameters live in
//! one struct so two runs can be compared field by field.
//!
//! The defaults reproduce the reference behaviour: 10 s page scrape, 15 s PNG
//! scrape retried 3 times with a fixed 2 s delay, 100 generic image links,
//! 5000 characters of model input, temperature 0.7, 4000 output tokens.

use crate::error::PaperReaderError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default OpenAI-compatible endpoint (DashScope compatible mode).
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default chat model on [`DEFAULT_BASE_URL`].
pub const DEFAULT_MODEL: &str = "qwen-plus";

/// Desktop browser User-Agent sent with every page request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Configuration for one paper-reading run.
///
/// Built via [`ReaderConfig::builder()`] or using [`ReaderConfig::default()`].
///
/// # Example
/// ```rust
/// use paper_reader::{ReaderConfig, RetryPolicy};
///
/// let config = ReaderConfig::builder()
///     .output_dir("reports")
///     .png_retry(RetryPolicy::immediate(1))
///     .model("qwen-max")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_images, 100);
/// ```
#[derive(Clone)]
pub struct ReaderConfig {
    /// Directory receiving `<title>.json` and `<title>.html`. Default: `paper_output`.
    pub output_dir: PathBuf,

    /// Directory receiving `scraped_data.json` and the temporary PNG
    /// manifest. Default: the current directory.
    pub work_dir: PathBuf,

    /// Timeout of the generic page scrape in seconds. Default: 10.
    pub scrape_timeout_secs: u64,

    /// Timeout of each PNG scrape attempt in seconds. Default: 15.
    pub png_timeout_secs: u64,

    /// Timeout of the `<title>` re-fetch used by title extraction. Default: 5.
    pub title_timeout_secs: u64,

    /// Retry policy of the PNG scrape. Default: 3 attempts, 2 s apart.
    pub png_retry: RetryPolicy,

    /// Maximum number of links kept by the generic image pass. Default: 100.
    pub max_images: usize,

    /// Optional cap on the PNG pass. Default: `None` (uncapped).
    pub max_png_images: Option<usize>,

    /// Characters of scraped text sent to the model. Default: 5000.
    pub max_input_chars: usize,

    /// PNG images shown in the HTML gallery. Default: 20.
    pub gallery_limit: usize,

    /// Characters of raw scraped text embedded in the HTML report. Default: 1000.
    pub excerpt_chars: usize,

    /// Write `scraped_data.json` after the generic scrape. Default: true.
    pub write_scrape_cache: bool,

    /// Chat model identifier. If None, uses [`DEFAULT_MODEL`] (or the
    /// provider default when `provider_name` is set).
    pub model: Option<String>,

    /// Named edgequake-llm provider (e.g. "openai", "anthropic", "ollama").
    /// If None, the OpenAI-compatible endpoint at `base_url` is used.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Base URL of the OpenAI-compatible endpoint. If None, uses
    /// `QWEN_BASE_URL` from the environment, then [`DEFAULT_BASE_URL`].
    pub base_url: Option<String>,

    /// API key for the OpenAI-compatible endpoint. If None, uses
    /// `QWEN_API_KEY`. A missing key is not an error until the first call.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Maximum output tokens of the summary. Default: 4000.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in summary prompt.
    pub system_prompt: Option<String>,

    /// User-Agent header sent with page requests.
    pub user_agent: String,

    /// Optional stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("paper_output"),
            work_dir: PathBuf::from("."),
            scrape_timeout_secs: 10,
            png_timeout_secs: 15,
            title_timeout_secs: 5,
            png_retry: RetryPolicy::default(),
            max_images: 100,
            max_png_images: None,
            max_input_chars: 5000,
            gallery_limit: 20,
            excerpt_chars: 1000,
            write_scrape_cache: true,
            model: None,
            provider_name: None,
            provider: None,
            base_url: None,
            api_key: None,
            temperature: 0.7,
            max_tokens: 4000,
            system_prompt: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("output_dir", &self.output_dir)
            .field("work_dir", &self.work_dir)
            .field("scrape_timeout_secs", &self.scrape_timeout_secs)
            .field("png_timeout_secs", &self.png_timeout_secs)
            .field("title_timeout_secs", &self.title_timeout_secs)
            .field("png_retry", &self.png_retry)
            .field("max_images", &self.max_images)
            .field("max_png_images", &self.max_png_images)
            .field("max_input_chars", &self.max_input_chars)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl ReaderConfig {
    /// Create a new builder for `ReaderConfig`.
    pub fn builder() -> ReaderConfigBuilder {
        ReaderConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model identifier for the OpenAI-compatible endpoint.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Resolve the endpoint base URL: config, then `QWEN_BASE_URL`, then default.
    pub fn resolved_base_url(&self) -> String {
        if let Some(ref url) = self.base_url {
            return url.clone();
        }
        match std::env::var("QWEN_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Resolve the API key: config, then `QWEN_API_KEY`, then empty.
    pub fn resolved_api_key(&self) -> String {
        self.api_key
            .clone()
            .or_else(|| std::env::var("QWEN_API_KEY").ok())
            .unwrap_or_default()
    }
}

/// Builder for [`ReaderConfig`].
#[derive(Debug)]
pub struct ReaderConfigBuilder {
    config: ReaderConfig,
}

impl ReaderConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn scrape_timeout_secs(mut self, secs: u64) -> Self {
        self.config.scrape_timeout_secs = secs;
        self
    }

    pub fn png_timeout_secs(mut self, secs: u64) -> Self {
        self.config.png_timeout_secs = secs;
        self
    }

    pub fn title_timeout_secs(mut self, secs: u64) -> Self {
        self.config.title_timeout_secs = secs;
        self
    }

    pub fn png_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.png_retry = policy;
        self
    }

    pub fn max_images(mut self, n: usize) -> Self {
        self.config.max_images = n;
        self
    }

    pub fn max_png_images(mut self, n: usize) -> Self {
        self.config.max_png_images = Some(n);
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn gallery_limit(mut self, n: usize) -> Self {
        self.config.gallery_limit = n;
        self
    }

    pub fn excerpt_chars(mut self, n: usize) -> Self {
        self.config.excerpt_chars = n;
        self
    }

    pub fn write_scrape_cache(mut self, v: bool) -> Self {
        self.config.write_scrape_cache = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReaderConfig, PaperReaderError> {
        let c = &self.config;
        if c.scrape_timeout_secs == 0 || c.png_timeout_secs == 0 || c.title_timeout_secs == 0 {
            return Err(PaperReaderError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.png_retry.max_attempts == 0 {
            return Err(PaperReaderError::InvalidConfig(
                "PNG retry policy needs at least one attempt".into(),
            ));
        }
        if c.max_input_chars == 0 {
            return Err(PaperReaderError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(PaperReaderError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Retry policy ─────────────────────────────────────────────────────────

/// Fixed-delay retry policy: `max_attempts` tries, `delay` between each,
/// no jitter and no growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Must be ≥ 1.
    pub max_attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// `max_attempts` tries with no pause in between.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// A single attempt.
    pub fn none() -> Self {
        Self::immediate(1)
    }

    /// True when attempt `attempt` (0-based) is the last one.
    pub fn is_last(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_attempts
    }
}
