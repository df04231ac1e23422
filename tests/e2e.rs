//! End-to-end integration tests for edgequake-tldr.
//!
//! These tests use real files in `./test_cases/`, the pdfium shared library,
//! the tesseract binary and live LLM API calls. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 DYLD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_extract -- --nocapture

use edgequake_tldr::{
    copy_text, extract_file, render, summarize_file, summarize_to_file, Block, ExtractionOutcome,
    LengthTier, Session, SessionState, SummarizeError, SummarizerBackend, SummarizerConfig,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn live_config(length: LengthTier, highlight: bool) -> SummarizerConfig {
    SummarizerConfig::builder()
        .length(length)
        .highlight(highlight)
        .api_timeout_secs(90)
        .build()
        .expect("valid config")
}

fn offline_config() -> SummarizerConfig {
    SummarizerConfig::builder()
        .backend(SummarizerBackend::Stub)
        .build()
        .expect("valid config")
}

/// Basic checks every generated summary should pass.
fn assert_summary_quality(summary: &str, context: &str) {
    assert!(!summary.trim().is_empty(), "[{context}] Summary is empty");

    let words = copy_text(summary).split_whitespace().count();
    assert!(words >= 5, "[{context}] Summary suspiciously short: {words} words");
    // The budget is advisory; flag only gross overruns.
    assert!(words <= 600, "[{context}] Summary far over budget: {words} words");

    println!("[{context}] ✓  {words} words");
}

// ── Extraction (no LLM) ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_arxiv_paper() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let result = extract_file(path.to_str().unwrap(), &offline_config())
        .await
        .expect("extract_file() should succeed");

    let ExtractionOutcome::Extracted { pages } = result.outcome else {
        panic!("extraction failed: {:?}", result.outcome);
    };
    assert_eq!(pages, 15, "Attention paper should have 15 pages");

    let markers: Vec<usize> = result
        .text
        .lines()
        .filter_map(|l| l.strip_prefix("--- Page ")?.strip_suffix(" ---")?.parse().ok())
        .collect();
    assert_eq!(markers, (1..=15).collect::<Vec<_>>());
    assert!(result.text.contains("Attention"));
}

#[tokio::test]
async fn test_extract_scanned_image() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("scanned_page.png"));

    let result = extract_file(path.to_str().unwrap(), &offline_config())
        .await
        .expect("extract_file() should succeed");

    assert!(result.is_extracted(), "OCR failed: {:?}", result.outcome);
    assert!(result.text.split_whitespace().count() > 10);
}

#[tokio::test]
async fn test_extract_nonexistent() {
    let err = extract_file("/no/such/file.pdf", &offline_config())
        .await
        .unwrap_err();
    assert!(matches!(err, SummarizeError::FileNotFound { .. }));
}

// ── Summaries (need LLM API) ─────────────────────────────────────────────────

/// Offline stub: exercises pdfium and the controller without an API key.
#[tokio::test]
async fn test_offline_summary_of_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_text.pdf"));

    let output = summarize_file(path.to_str().unwrap(), &offline_config())
        .await
        .expect("offline summary should succeed");

    assert!(output.extraction.is_extracted());
    assert_eq!(output.stats.total_input_tokens, 0);
    assert!(render(&output.summary.text, true)
        .iter()
        .any(|b| matches!(b, Block::Bullet(_))));
}

#[tokio::test]
async fn test_short_highlighted_summary() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let output = summarize_file(path.to_str().unwrap(), &live_config(LengthTier::Short, true))
        .await
        .expect("summarize_file() should succeed");

    assert_summary_quality(&output.summary.text, "attention/short");
    assert!(output.summary.highlight);
    println!("{}", copy_text(&output.summary.text));
}

#[tokio::test]
async fn test_summary_json_serialisable() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_text.pdf"));

    let output = summarize_file(path.to_str().unwrap(), &live_config(LengthTier::Medium, false))
        .await
        .expect("summarize_file() should succeed");

    let json = serde_json::to_string_pretty(&output).expect("serialisable");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
    assert_eq!(value["summary"]["length"], "medium");
    assert_eq!(value["extraction"]["outcome"]["status"], "extracted");
}

#[tokio::test]
async fn test_summary_to_file() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_text.pdf"));
    let out = output_dir().join("sample_text.summary.txt");

    let stats = summarize_to_file(path.to_str().unwrap(), &out, &live_config(LengthTier::Long, false))
        .await
        .expect("summarize_to_file() should succeed");

    let written = std::fs::read_to_string(&out).expect("output written");
    assert_summary_quality(&written, "sample_text/long");
    assert!(!written.contains("**"));
    assert!(stats.summary_chars > 0);
}

/// Regenerate the same extraction at every tier in one session.
#[tokio::test]
async fn test_session_regenerates_per_tier() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let mut session = Session::from_config(&live_config(LengthTier::Short, false))
        .expect("session should start");
    let report = session
        .upload_inputs(&[path.to_str().unwrap()])
        .await
        .expect("upload should succeed");
    assert_eq!(report.accepted.len(), 1);

    let mut word_counts = Vec::new();
    for tier in LengthTier::ALL {
        session.set_length(tier).unwrap();
        let summary = session.generate().await.expect("generate should succeed");
        let words = copy_text(&summary.text).split_whitespace().count();
        println!("{tier}: {words} words");
        word_counts.push(words);
        assert_eq!(session.state(), SessionState::SummaryReady);
    }
    // Advisory budgets: long should not come out shorter than short.
    assert!(word_counts[2] >= word_counts[0], "{word_counts:?}");
}
