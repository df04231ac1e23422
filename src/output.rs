//! Result types produced by the pipeline.

use crate::config::LengthTier;
use crate::error::ExtractionError;
use crate::pipeline::input::FileId;
use serde::{Deserialize, Serialize};

/// Shown in place of extracted text when the file type has no extractor.
pub const UNSUPPORTED_SENTINEL: &str = "Unsupported file type.";

/// Shown in place of extracted text when extraction failed.
pub const FAILED_SENTINEL: &str = "Failed to extract text from the document.";

/// Plain text extracted from one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Source file.
    pub file_id: FileId,
    /// Extracted text, or one of the sentinel strings.
    pub text: String,
    pub outcome: ExtractionOutcome,
    /// Wall-clock extraction time.
    pub duration_ms: u64,
}

impl ExtractionResult {
    pub(crate) fn unsupported(file_id: FileId, duration_ms: u64) -> Self {
        Self {
            file_id,
            text: UNSUPPORTED_SENTINEL.to_string(),
            outcome: ExtractionOutcome::Unsupported,
            duration_ms,
        }
    }

    pub(crate) fn failed(file_id: FileId, error: ExtractionError, duration_ms: u64) -> Self {
        Self {
            file_id,
            text: FAILED_SENTINEL.to_string(),
            outcome: ExtractionOutcome::Failed { error },
            duration_ms,
        }
    }

    /// True when `text` is real document content rather than a sentinel.
    pub fn is_extracted(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Extracted { .. })
    }
}

/// How an extraction settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Text was extracted. `pages` is 1 for OCR'd images.
    Extracted { pages: usize },
    /// The media type has no extractor.
    Unsupported,
    /// Extraction failed; the text is the failure sentinel.
    Failed { error: ExtractionError },
}

/// A generated summary and the inputs it was generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Raw model response, possibly containing `**bold**` and `* bullet` markup.
    pub text: String,
    /// Tier selected when generation was triggered.
    pub length: LengthTier,
    /// Highlight flag selected when generation was triggered.
    pub highlight: bool,
    /// Extraction the summary was derived from.
    pub source_file: FileId,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Everything produced by a one-shot [`crate::summarize::summarize_file`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    /// Display name of the summarised file.
    pub file_name: String,
    /// Declared media type of the summarised file.
    pub media_type: String,
    pub extraction: ExtractionResult,
    pub summary: SummaryResult,
    pub stats: SummaryStats,
}

/// Aggregated timings and token usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub file_bytes: u64,
    pub extracted_chars: usize,
    pub summary_chars: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub extraction_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}
