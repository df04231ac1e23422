//! Error types for the edgequake-tldr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SummarizeError`] — **Fatal** for the operation that returns it: the
//!   file was rejected, the provider is not configured, the LLM call failed,
//!   or the session was asked to do something its state does not allow.
//!
//! * [`ExtractionError`] — **Non-fatal**: a PDF or image could not be turned
//!   into text. The extractor never propagates it; it is logged, kept in
//!   [`crate::output::ExtractionOutcome::Failed`], and replaced by the
//!   "failed to extract" sentinel text so the pipeline always reaches a
//!   displayable state.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-tldr library.
#[derive(Debug, Error)]
pub enum SummarizeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Validation errors ─────────────────────────────────────────────────
    /// File is larger than the upload cap.
    #[error("'{name}' is {size} bytes, over the {limit}-byte upload limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// Declared media type is neither PDF nor an image.
    #[error("'{name}' has unsupported type '{media_type}'; upload a PDF or an image")]
    UnsupportedMediaType { name: String, media_type: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error. Not retried.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM call exceeded the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    // ── Session errors ────────────────────────────────────────────────────
    /// Generate was requested before any text was extracted.
    #[error("No extracted text yet; upload a document first")]
    NoExtractedText,

    /// Retry was requested but there is no active file to re-extract.
    #[error("No active file to retry")]
    NoActiveFile,

    /// File id does not name a file in the session.
    #[error("No file with id {id} in this session")]
    UnknownFile { id: u64 },

    /// An extraction or generation is already in flight.
    #[error("Session is busy ({state}); wait for it to finish")]
    Busy { state: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
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

impl SummarizeError {
    /// True for the errors produced by upload validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SummarizeError::FileTooLarge { .. } | SummarizeError::UnsupportedMediaType { .. }
        )
    }
}

/// A non-fatal text-extraction failure.
///
/// Never returned from [`crate::pipeline::extract::TextExtractor::extract`];
/// it is converted to sentinel text there.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ExtractionError {
    /// pdfium could not be loaded.
    #[error("pdfium library unavailable: {detail}")]
    PdfiumUnavailable { detail: String },

    /// The PDF could not be opened (corrupt, encrypted, not a PDF).
    #[error("could not open PDF: {detail}")]
    PdfOpenFailed { detail: String },

    /// A single page's text layer could not be read.
    #[error("page {page}: text extraction failed: {detail}")]
    PdfPageFailed { page: usize, detail: String },

    /// Image bytes could not be decoded.
    #[error("could not decode image: {detail}")]
    ImageDecodeFailed { detail: String },

    /// The OCR engine failed or could not be started.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// Temporary-file or process I/O failed.
    #[error("I/O error during extraction: {detail}")]
    Io { detail: String },

    /// The blocking extraction task panicked or was cancelled.
    #[error("extraction task aborted: {detail}")]
    TaskAborted { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_display() {
        let e = SummarizeError::FileTooLarge {
            name: "scan.png".into(),
            size: 11 * 1024 * 1024,
            limit: 10 * 1024 * 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.png"), "got: {msg}");
        assert!(msg.contains("10485760"), "got: {msg}");
        assert!(e.is_validation());
    }

    #[test]
    fn unsupported_media_type_display() {
        let e = SummarizeError::UnsupportedMediaType {
            name: "notes.docx".into(),
            media_type: "application/msword".into(),
        };
        assert!(e.to_string().contains("application/msword"));
        assert!(e.is_validation());
    }

    #[test]
    fn busy_is_not_validation() {
        let e = SummarizeError::Busy {
            state: "generating".into(),
        };
        assert!(e.to_string().contains("generating"));
        assert!(!e.is_validation());
    }

    #[test]
    fn extraction_error_display() {
        let e = ExtractionError::PdfPageFailed {
            page: 3,
            detail: "bad stream".into(),
        };
        assert!(e.to_string().contains("page 3"));
        assert!(e.to_string().contains("bad stream"));
    }
}
