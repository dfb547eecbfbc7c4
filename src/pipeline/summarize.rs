//! Summary stage: truncate, skip-check, one chat call, fold errors.
//!
//! Never returns an error. Every outcome is a string stored in
//! [`SummaryResult::text_summary`]: the model's answer or one of the
//! sentinels in [`crate::prompts`].

use crate::config::ReaderConfig;
use crate::error::PaperReaderError;
use crate::output::SummaryResult;
use crate::pipeline::llm::{ChatModel, ChatOptions, ChatTurn};
use crate::prompts::{
    self, EMPTY_RESPONSE, SCRAPE_FAILED_MARKER, SUMMARY_SKIPPED, SUMMARY_SYSTEM_PROMPT,
    TRUNCATION_MARKER,
};
use tracing::{info, warn};

/// Cut `text` to `max_chars` characters, appending [`TRUNCATION_MARKER`]
/// when anything was dropped.
pub fn truncate_input(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// True when there is nothing worth sending to the model.
pub fn should_skip(text: &str) -> bool {
    text.is_empty() || text.contains(SCRAPE_FAILED_MARKER)
}

/// Build the system + user messages for `text`.
pub fn build_messages(text: &str, config: &ReaderConfig) -> Vec<ChatTurn> {
    let system = config
        .system_prompt
        .as_deref()
        .unwrap_or(SUMMARY_SYSTEM_PROMPT);
    vec![
        ChatTurn::system(system),
        ChatTurn::user(prompts::summary_user_prompt(text)),
    ]
}

/// Summarise scraped page text.
pub async fn summarize(model: &dyn ChatModel, text: &str, config: &ReaderConfig) -> SummaryResult {
    if should_skip(text) {
        warn!("no usable page text, skipping summary");
        return SummaryResult {
            text_summary: SUMMARY_SKIPPED.to_string(),
        };
    }

    let input = truncate_input(text, config.max_input_chars);
    let messages = build_messages(&input, config);
    let options = ChatOptions::from_config(config);

    info!(
        "summarising {} chars with {}",
        input.chars().count(),
        model.model_name()
    );

    let text_summary = match model.chat(&messages, &options).await {
        Ok(summary) => summary,
        Err(PaperReaderError::EmptyResponse) => {
            warn!("model returned an empty completion");
            EMPTY_RESPONSE.to_string()
        }
        Err(e) => {
            warn!("model call failed: {}", e);
            prompts::model_failed(&e)
        }
    };

    SummaryResult { text_summary }
}
