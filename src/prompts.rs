//! Prompts for LLM-based summarisation.
//!
//! Every prompt string lives here so tests can inspect them without a
//! provider. The system prompt and the per-request instruction repeat the same
//! no-hallucination constraints: the system role frames the model, the user
//! prompt carries the word budget and the text.
//!
//! Callers can override the system prompt via
//! [`crate::config::SummarizerConfig::system_prompt`].

use crate::config::LengthTier;

/// Default system prompt: a strict-extraction summariser.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a summarization assistant. Your task is to create a summary of the provided text. \
Please focus only on the content given in the input text. Do not add any external knowledge, opinions, or details \
that are not mentioned in the input. The summary should be concise and within the specified word limit. \
Keep your response strictly to the main ideas and points provided in the text. \
Avoid any hallucination or fabrication of content.";

/// Appended to the instruction when the highlight flag is set.
pub const HIGHLIGHT_INSTRUCTION: &str = " Additionally, highlight the key points in bullet points.";

/// Inputs for one generate action. Built fresh each time, never stored.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub text: &'a str,
    pub length: LengthTier,
    pub highlight: bool,
}

impl SummaryRequest<'_> {
    pub fn prompt(&self) -> String {
        build_prompt(self.text, self.length, self.highlight)
    }
}

/// Build the user prompt for `text`.
///
/// Deterministic: the same inputs always give the same string.
pub fn build_prompt(text: &str, length: LengthTier, highlight: bool) -> String {
    let words = length.word_limit();
    let highlight = if highlight { HIGHLIGHT_INSTRUCTION } else { "" };
    format!(
        "You are a summarization assistant. Your task is to summarize the following text in approximately {words} words. \
Only summarize the content that is present in the provided text. Do not add, omit, or alter any information. \
Your summary should strictly reflect the main points and ideas from the input text. \
Avoid any hallucinations, fabrication of new content, or additional information. \
Focus solely on what is provided, and ensure the summary remains within the specified word limit.{highlight}\n\nText: {}",
        normalise_text(text)
    )
}

/// Each newline becomes one space; surrounding whitespace is trimmed.
pub fn normalise_text(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}
