//! HTTP fetching: one GET per call, browser-like headers, explicit timeout.
//!
//! The fetcher sits behind the [`PageFetcher`] trait so the orchestrator can
//! be driven by an in-memory fake in tests. Only the PNG scrape retries, and
//! it does so through [`fetch_with_retry`] with a fixed-delay
//! [`RetryPolicy`]; every other caller gets exactly one attempt.

use crate::config::RetryPolicy;
use crate::error::PaperReaderError;
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Decoded response body.
    pub body: String,
}

/// Source of web pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url`, failing on transport errors, timeouts and non-2xx statuses.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, PaperReaderError>;
}

/// Check if the input string carries an HTTP(S) scheme.
pub fn is_http_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// [`PageFetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client that sends `user_agent` and an HTML `Accept` header.
    pub fn new(user_agent: &str) -> Result<Self, PaperReaderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| PaperReaderError::InvalidConfig(format!("user agent: {e}")))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PaperReaderError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, PaperReaderError> {
        if !is_http_url(url) || reqwest::Url::parse(url).is_err() {
            return Err(PaperReaderError::InvalidUrl {
                url: url.to_string(),
            });
        }

        debug!("GET {} (timeout {}s)", url, timeout.as_secs());
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaperReaderError::Network {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, timeout, e))?;
        let body = decode_body(&bytes, &content_type);

        debug!("{}: {} bytes", final_url, body.len());
        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Bytes of the document searched for a `<meta charset>` declaration.
const META_SNIFF_BYTES: usize = 1024;

/// Decode a response body: `Content-Type` charset, then `<meta>` charset,
/// then UTF-8. A BOM overrides all of them.
pub fn decode_body(bytes: &[u8], content_type: &str) -> String {
    let encoding = charset_from_content_type(content_type)
        .or_else(|| charset_from_meta(bytes))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("body is not clean {}; undecodable bytes replaced", used.name());
    }
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (name, value) = part.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Covers both `<meta charset="gbk">` and the
/// `<meta http-equiv="Content-Type" content="text/html; charset=gbk">` form.
fn charset_from_meta(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(at) = rest.find("<meta") {
        rest = &rest[at + 5..];
        let tag = &rest[..rest.find('>').unwrap_or(rest.len())];
        if let Some(pos) = tag.find("charset=") {
            let label: String = tag[pos + 8..]
                .trim_start_matches(|c: char| c == '"' || c == '\'')
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
                .collect();
            if !label.is_empty() {
                return Some(label);
            }
        }
    }
    None
}

fn transport_error(url: &str, timeout: Duration, e: reqwest::Error) -> PaperReaderError {
    if e.is_timeout() {
        PaperReaderError::Timeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        }
    } else {
        PaperReaderError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Fetch `url`, retrying per `policy`. Only the last attempt's error is returned.
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &str,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<FetchedPage, PaperReaderError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(url, timeout).await {
            Ok(page) => return Ok(page),
            Err(e) if policy.is_last(attempt) => return Err(e),
            Err(e) => {
                warn!(
                    "GET {}: attempt {}/{} failed: {}; retrying in {:?}",
                    url,
                    attempt + 1,
                    policy.max_attempts,
                    e,
                    policy.delay
                );
                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
