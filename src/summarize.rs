//! One-shot entry points: load, extract, summarise, return.
//!
//! Each call drives a fresh [`Session`] through one upload and one generate,
//! so the one-shot path and the interactive path share the same state
//! machine. Use [`Session`] directly to regenerate with another tier, retry
//! extraction or keep several files around.

use crate::config::SummarizerConfig;
use crate::error::SummarizeError;
use crate::output::{ExtractionResult, SummaryOutput, SummaryStats};
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::input::{self, UploadedFile};
use crate::pipeline::render;
use crate::session::{Session, UploadReport};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Summarise a local file or HTTP/HTTPS URL.
///
/// # Errors
/// Fatal for this call only:
/// - the input cannot be loaded, is too large or has an unsupported type
/// - no LLM provider can be resolved
/// - the model call fails or times out
///
/// Extraction failures are not errors: the summary is generated from the
/// sentinel text, and `output.extraction.outcome` says what happened.
pub async fn summarize_file(
    input: impl AsRef<str>,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    info!("Starting summary: {}", input);

    let mut session = Session::from_config(config)?;
    let report = session.upload_inputs(&[input]).await?;
    finish(&mut session, report, total_start).await
}

/// Summarise in-memory bytes. The media type is inferred from `name` and
/// the leading bytes.
///
/// # Example
/// ```rust,no_run
/// use edgequake_tldr::{summarize_bytes, SummarizerConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("report.pdf")?;
/// let config = SummarizerConfig::default();
/// let output = summarize_bytes("report.pdf", bytes, &config).await?;
/// println!("{}", output.summary.text);
/// # Ok(())
/// # }
/// ```
pub async fn summarize_bytes(
    name: impl Into<String>,
    bytes: impl Into<Vec<u8>>,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    let total_start = Instant::now();
    let name = name.into();
    let bytes = bytes.into();
    let media_type = input::media_type_for(&name, &bytes);
    info!("Starting summary: {} ({} bytes, {})", name, bytes.len(), media_type);

    let mut session = Session::from_config(config)?;
    let report = session
        .upload(vec![UploadedFile::new(name, media_type, bytes)])
        .await?;
    finish(&mut session, report, total_start).await
}

/// Summarise and write the plain summary text to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn summarize_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &SummarizerConfig,
) -> Result<SummaryStats, SummarizeError> {
    let output = summarize_file(input, config).await?;
    write_atomic(output_path.as_ref(), &render::copy_text(&output.summary.text)).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`summarize_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    input: impl AsRef<str>,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SummarizeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize_file(input, config))
}

/// Extract text without summarising.
///
/// Does not require an LLM provider or API key.
pub async fn extract_file(
    input: impl AsRef<str>,
    config: &SummarizerConfig,
) -> Result<ExtractionResult, SummarizeError> {
    let file = input::load_input(
        input.as_ref(),
        config.max_file_bytes,
        config.download_timeout_secs,
    )
    .await?;
    file.validate(config.max_file_bytes)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(&file.name, file.kind.as_str());
    }
    let result = TextExtractor::from_config(config).extract(&file).await;
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(&file.name, result.text.len());
    }
    Ok(result)
}

/// Write `contents` to `path` via a sibling temp file.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), SummarizeError> {
    let write_err = |e| SummarizeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Turn a single-file upload into a generated summary.
async fn finish(
    session: &mut Session,
    mut report: UploadReport,
    total_start: Instant,
) -> Result<SummaryOutput, SummarizeError> {
    if let Some(rejection) = report.rejected.pop() {
        warn!("'{}' rejected: {}", rejection.name, rejection.error);
        return Err(rejection.error);
    }
    let extraction = report
        .extraction
        .ok_or_else(|| SummarizeError::Internal("upload accepted no file".into()))?;
    if !extraction.is_extracted() {
        warn!("Summarising placeholder text: {}", extraction.text);
    }

    let (file_name, media_type, file_bytes) = session
        .active_file()
        .map(|f| (f.name.clone(), f.media_type.clone(), f.size))
        .ok_or(SummarizeError::NoActiveFile)?;

    let summary = session.generate().await?.clone();

    let stats = SummaryStats {
        file_bytes,
        extracted_chars: extraction.text.chars().count(),
        summary_chars: summary.text.chars().count(),
        total_input_tokens: summary.input_tokens as u64,
        total_output_tokens: summary.output_tokens as u64,
        extraction_duration_ms: extraction.duration_ms,
        generation_duration_ms: summary.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Summary complete: {} chars from {} extracted chars, {}ms total",
        stats.summary_chars, stats.extracted_chars, stats.total_duration_ms
    );

    Ok(SummaryOutput {
        file_name,
        media_type,
        extraction,
        summary,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummarizerBackend;
    use crate::pipeline::llm::STUB_SUMMARY;

    fn stub_config() -> SummarizerConfig {
        SummarizerConfig::builder()
            .backend(SummarizerBackend::Stub)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn unsupported_bytes_are_rejected() {
        let err = summarize_bytes("notes.docx", b"PK\x03\x04".to_vec(), &stub_config())
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let err = summarize_file("/definitely/not/here.pdf", &stub_config())
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        std::fs::write(&path, vec![0u8; 64]).unwrap();
        let config = SummarizerConfig::builder()
            .backend(SummarizerBackend::Stub)
            .max_file_bytes(16)
            .build()
            .unwrap();
        let err = extract_file(path.to_string_lossy(), &config).await.unwrap_err();
        assert!(matches!(err, SummarizeError::FileTooLarge { .. }));
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.txt");
        write_atomic(&path, "hello").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(!dir.path().join("nested").join("summary.txt.tmp").exists());
    }

    #[test]
    fn stub_summary_survives_copy_text() {
        let copied = render::copy_text(STUB_SUMMARY);
        assert!(copied.starts_with("Offline preview."));
        assert!(!copied.contains('*'));
    }
}
