//! The pipeline controller: one session's files, extraction and summary.
//!
//! ```text
//!            upload (valid)              generate
//!   Idle ──────────────▶ Extracting ──▶ ExtractedIdle ◀────────┐
//!                             ▲          │      ▲              │ failure
//!                     retry   │          ▼      │ generate     │
//!                             └──── SummaryReady ◀── Generating ┘
//! ```
//!
//! [`Session`] owns every piece of mutable state and is driven through
//! `&mut self`, so two operations can never overlap. Changing the length
//! tier or the highlight flag never transitions; it only affects the next
//! generate. A new extraction clears the summary, so a summary on screen is
//! always derived from the extraction on screen.
//!
//! Extraction failures show up as sentinel text; generation failures are
//! logged, recorded as the session's inline [`Session::error`], and
//! returned to the caller.

use crate::config::{LengthTier, SummarizerConfig, DEFAULT_MAX_FILE_BYTES};
use crate::error::SummarizeError;
use crate::output::{ExtractionResult, SummaryResult};
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::input::{self, FileId, UploadedFile};
use crate::pipeline::llm::{resolve_summarizer, Summarizer};
use crate::pipeline::render::{self, Block};
use crate::progress::ProgressCallback;
use crate::prompts::SummaryRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the session is in the ingest → summarise cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing extracted yet.
    Idle,
    /// Text extraction in flight.
    Extracting,
    /// Text available, no summary.
    ExtractedIdle,
    /// Summariser call in flight.
    Generating,
    /// Text and summary available.
    SummaryReady,
}

impl SessionState {
    /// Extraction or generation in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Extracting | SessionState::Generating)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Extracting => "extracting",
            SessionState::ExtractedIdle => "extracted",
            SessionState::Generating => "generating",
            SessionState::SummaryReady => "summary ready",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file that did not make it into the session.
#[derive(Debug)]
pub struct Rejection {
    /// File name, path or URL as given.
    pub name: String,
    pub error: SummarizeError,
}

/// What an upload did.
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Files added to the session, in order.
    pub accepted: Vec<FileId>,
    pub rejected: Vec<Rejection>,
    /// Extraction of the first accepted file, if any.
    pub extraction: Option<ExtractionResult>,
}

/// Sets a busy state and restores the previous one unless finished, so a
/// dropped in-flight future never leaves the session stuck.
struct StateGuard<'a> {
    state: &'a mut SessionState,
    fallback: SessionState,
    finished: bool,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a mut SessionState, busy: SessionState) -> Self {
        let fallback = *state;
        debug!("state {} -> {}", fallback, busy);
        *state = busy;
        Self {
            state,
            fallback,
            finished: false,
        }
    }

    fn finish(mut self, next: SessionState) {
        debug!("state {} -> {}", self.state, next);
        *self.state = next;
        self.finished = true;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("operation abandoned while {}; back to {}", self.state, self.fallback);
            *self.state = self.fallback;
        }
    }
}

/// One user's summarisation session.
pub struct Session {
    extractor: TextExtractor,
    summarizer: Arc<dyn Summarizer>,
    progress: Option<ProgressCallback>,
    max_file_bytes: u64,
    download_timeout_secs: u64,

    state: SessionState,
    files: Vec<UploadedFile>,
    active_file: Option<FileId>,
    extraction: Option<ExtractionResult>,
    summary: Option<SummaryResult>,
    length: LengthTier,
    highlight: bool,
    error: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("summarizer", &self.summarizer.name())
            .field("state", &self.state)
            .field("files", &self.files)
            .field("active_file", &self.active_file)
            .field("length", &self.length)
            .field("highlight", &self.highlight)
            .field("error", &self.error)
            .finish()
    }
}

impl Session {
    pub fn new(extractor: TextExtractor, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            extractor,
            summarizer,
            progress: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            download_timeout_secs: 120,
            state: SessionState::Idle,
            files: Vec::new(),
            active_file: None,
            extraction: None,
            summary: None,
            length: LengthTier::default(),
            highlight: false,
            error: None,
        }
    }

    /// Engines, summariser, limits and initial tier/highlight from `config`.
    pub fn from_config(config: &SummarizerConfig) -> Result<Self, SummarizeError> {
        let summarizer = resolve_summarizer(config)?;
        let mut session = Self::new(TextExtractor::from_config(config), summarizer);
        session.progress = config.progress_callback.clone();
        session.max_file_bytes = config.max_file_bytes;
        session.download_timeout_secs = config.download_timeout_secs;
        session.length = config.length;
        session.highlight = config.highlight;
        Ok(session)
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn active_file(&self) -> Option<&UploadedFile> {
        let id = self.active_file?;
        self.files.iter().find(|f| f.id == id)
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        self.extraction.as_ref()
    }

    pub fn summary(&self) -> Option<&SummaryResult> {
        self.summary.as_ref()
    }

    pub fn length(&self) -> LengthTier {
        self.length
    }

    pub fn highlight(&self) -> bool {
        self.highlight
    }

    /// Inline error message from the last upload or generate, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    // ── Options ──────────────────────────────────────────────────────────

    /// Select the tier for the next generate. No transition.
    pub fn set_length(&mut self, length: LengthTier) -> Result<(), SummarizeError> {
        self.ensure_idle()?;
        self.length = length;
        Ok(())
    }

    /// Toggle bullet key points for the next generate. No transition.
    pub fn set_highlight(&mut self, highlight: bool) -> Result<(), SummarizeError> {
        self.ensure_idle()?;
        self.highlight = highlight;
        Ok(())
    }

    // ── File list ────────────────────────────────────────────────────────

    pub fn rename_file(&mut self, id: FileId, name: impl Into<String>) -> Result<(), SummarizeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SummarizeError::InvalidInput { input: name });
        }
        let file = self
            .files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(SummarizeError::UnknownFile { id: id.get() })?;
        debug!("rename {} '{}' -> '{}'", id, file.name, name);
        file.name = name;
        Ok(())
    }

    /// Drop a file from the list. The current extraction and summary stay;
    /// removing the active file only disables retry.
    pub fn remove_file(&mut self, id: FileId) -> Result<UploadedFile, SummarizeError> {
        let pos = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or(SummarizeError::UnknownFile { id: id.get() })?;
        if self.active_file == Some(id) {
            self.active_file = None;
        }
        Ok(self.files.remove(pos))
    }

    // ── Pipeline ─────────────────────────────────────────────────────────

    /// Load paths or URLs and upload them. Load failures become rejections.
    pub async fn upload_inputs<S: AsRef<str>>(&mut self, inputs: &[S]) -> Result<UploadReport, SummarizeError> {
        self.ensure_idle()?;
        let mut loaded = Vec::new();
        let mut rejected = Vec::new();
        for input in inputs {
            let input = input.as_ref();
            match input::load_input(input, self.max_file_bytes, self.download_timeout_secs).await {
                Ok(file) => loaded.push(file),
                Err(error) => rejected.push(Rejection {
                    name: input.to_string(),
                    error,
                }),
            }
        }
        self.ingest(loaded, rejected).await
    }

    /// Validate `candidates`, keep the valid ones, and extract the first.
    ///
    /// Invalid files never enter the session and never reach the extractor.
    /// With no valid file the state is unchanged.
    pub async fn upload(&mut self, candidates: Vec<UploadedFile>) -> Result<UploadReport, SummarizeError> {
        self.ensure_idle()?;
        self.ingest(candidates, Vec::new()).await
    }

    async fn ingest(
        &mut self,
        candidates: Vec<UploadedFile>,
        mut rejected: Vec<Rejection>,
    ) -> Result<UploadReport, SummarizeError> {
        let mut accepted = Vec::new();
        for file in candidates {
            match file.validate(self.max_file_bytes) {
                Ok(()) => accepted.push(file),
                Err(error) => rejected.push(Rejection {
                    name: file.name.clone(),
                    error,
                }),
            }
        }

        self.error = if rejected.is_empty() {
            None
        } else {
            for r in &rejected {
                warn!("Rejected '{}': {}", r.name, r.error);
            }
            Some(rejection_message(self.max_file_bytes))
        };

        let ids: Vec<FileId> = accepted.iter().map(|f| f.id).collect();
        let first = accepted.first().cloned();
        self.files.extend(accepted);
        info!("Upload: {} accepted, {} rejected", ids.len(), rejected.len());

        let extraction = match first {
            Some(file) => {
                self.active_file = Some(file.id);
                Some(self.run_extraction(file).await.clone())
            }
            None => None,
        };

        Ok(UploadReport {
            accepted: ids,
            rejected,
            extraction,
        })
    }

    /// Re-extract the active file.
    pub async fn retry(&mut self) -> Result<&ExtractionResult, SummarizeError> {
        self.ensure_idle()?;
        let file = self.active_file().cloned().ok_or(SummarizeError::NoActiveFile)?;
        info!("Retrying extraction of '{}'", file.name);
        Ok(self.run_extraction(file).await)
    }

    async fn run_extraction(&mut self, file: UploadedFile) -> &ExtractionResult {
        let progress = self.progress.clone();
        let guard = StateGuard::enter(&mut self.state, SessionState::Extracting);

        if let Some(ref cb) = progress {
            cb.on_extraction_start(&file.name, file.kind.as_str());
        }
        let result = self.extractor.extract(&file).await;
        if let Some(ref cb) = progress {
            cb.on_extraction_complete(&file.name, result.text.len());
        }

        self.summary = None;
        guard.finish(SessionState::ExtractedIdle);
        self.extraction.insert(result)
    }

    /// Summarise the current text with the current tier and highlight flag.
    ///
    /// On failure the session falls back to `ExtractedIdle` with no summary
    /// and the error recorded inline.
    pub async fn generate(&mut self) -> Result<&SummaryResult, SummarizeError> {
        self.ensure_idle()?;
        let extraction = self.extraction.as_ref().ok_or(SummarizeError::NoExtractedText)?;
        let source_file = extraction.file_id;
        let request = SummaryRequest {
            text: &extraction.text,
            length: self.length,
            highlight: self.highlight,
        };
        let prompt = request.prompt();
        let (length, highlight) = (request.length, request.highlight);

        let summarizer = Arc::clone(&self.summarizer);
        let progress = self.progress.clone();
        let guard = StateGuard::enter(&mut self.state, SessionState::Generating);

        if let Some(ref cb) = progress {
            cb.on_generation_start(length.word_limit(), highlight);
        }
        info!(
            "Generating {} summary{} with {}",
            length,
            if highlight { " (highlighted)" } else { "" },
            summarizer.name()
        );

        let start = Instant::now();
        match summarizer.summarize(&prompt).await {
            Ok(completion) => {
                if let Some(ref cb) = progress {
                    cb.on_generation_complete(completion.text.len());
                }
                self.error = None;
                guard.finish(SessionState::SummaryReady);
                Ok(self.summary.insert(SummaryResult {
                    text: completion.text,
                    length,
                    highlight,
                    source_file,
                    input_tokens: completion.input_tokens,
                    output_tokens: completion.output_tokens,
                    duration_ms: start.elapsed().as_millis() as u64,
                }))
            }
            Err(e) => {
                warn!("Error generating summary: {}", e);
                if let Some(ref cb) = progress {
                    cb.on_generation_error(&e.to_string());
                }
                self.summary = None;
                self.error = Some(e.to_string());
                guard.finish(SessionState::ExtractedIdle);
                Err(e)
            }
        }
    }

    // ── Display ──────────────────────────────────────────────────────────

    /// Blocks for the current summary, emphasised per the flag it was generated with.
    pub fn render(&self) -> Option<Vec<Block>> {
        self.summary
            .as_ref()
            .map(|s| render::render(&s.text, s.highlight))
    }

    /// Plain prose of the current summary for the clipboard.
    pub fn copy_text(&self) -> Option<String> {
        self.summary.as_ref().map(|s| render::copy_text(&s.text))
    }

    fn ensure_idle(&self) -> Result<(), SummarizeError> {
        if self.state.is_busy() {
            Err(SummarizeError::Busy {
                state: self.state.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn rejection_message(max_bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    let limit = if max_bytes >= MIB && max_bytes % MIB == 0 {
        format!("{}MB", max_bytes / MIB)
    } else {
        format!("{} bytes", max_bytes)
    };
    format!("Some files were rejected. Please upload only PDF or image files under {limit}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, SummarizeError};
    use crate::pipeline::extract::{OcrEngine, PdfTextSource};
    use crate::pipeline::llm::Completion;
    use futures::future::{BoxFuture, FutureExt};

    struct OnePage;

    impl PdfTextSource for OnePage {
        fn page_items(&self, _pdf: &[u8]) -> Result<Vec<Vec<String>>, ExtractionError> {
            Ok(vec![vec!["Only".into(), "page".into()]])
        }
    }

    impl OcrEngine for OnePage {
        fn recognize(&self, _image: &[u8]) -> Result<String, ExtractionError> {
            Ok("ocr".into())
        }
    }

    struct NeverSummarizer;

    impl Summarizer for NeverSummarizer {
        fn name(&self) -> &str {
            "never"
        }

        fn summarize<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<Completion, SummarizeError>> {
            futures::future::pending().boxed()
        }
    }

    fn session() -> Session {
        let engines = Arc::new(OnePage);
        Session::new(
            TextExtractor::new(engines.clone(), engines),
            Arc::new(NeverSummarizer),
        )
    }

    #[test]
    fn rejection_message_uses_megabytes() {
        assert_eq!(
            rejection_message(10 * 1024 * 1024),
            "Some files were rejected. Please upload only PDF or image files under 10MB."
        );
        assert!(rejection_message(500).ends_with("under 500 bytes."));
    }

    #[test]
    fn busy_states() {
        assert!(SessionState::Extracting.is_busy());
        assert!(SessionState::Generating.is_busy());
        assert!(!SessionState::Idle.is_busy());
        assert!(!SessionState::SummaryReady.is_busy());
    }

    #[tokio::test]
    async fn dropped_generate_restores_previous_state() {
        let mut s = session();
        let file = UploadedFile::new("a.pdf", "application/pdf", b"%PDF".to_vec());
        s.upload(vec![file]).await.unwrap();
        assert_eq!(s.state(), SessionState::ExtractedIdle);

        // Poll once: the summariser never resolves, then the future is dropped.
        assert!(s.generate().now_or_never().is_none());
        assert_eq!(s.state(), SessionState::ExtractedIdle);
        assert!(s.summary().is_none());
    }

    #[test]
    fn generate_before_upload_is_refused() {
        let mut s = session();
        let err = tokio_test::block_on(s.generate()).unwrap_err();
        assert!(matches!(err, SummarizeError::NoExtractedText));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn rename_rejects_blank_names() {
        let mut s = session();
        let err = s.rename_file(FileId::from_raw(u64::MAX), " ").unwrap_err();
        assert!(matches!(err, SummarizeError::InvalidInput { .. }));
    }
}
