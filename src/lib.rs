//! # edgequake-tldr
//!
//! Summarise PDF documents and images with an LLM.
//!
//! A PDF's text layer is read page by page through pdfium; an image is run
//! through tesseract OCR. The extracted text goes to the model with a
//! word budget (short ≈ 50, medium ≈ 100, long ≈ 200 words) and, on request,
//! an instruction to list key points as bullets. The answer is rendered as
//! bullets and bold spans, or flattened to plain prose for copying.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file / URL
//!  │
//!  ├─ 1. Intake    load, classify media type once, enforce 10 MiB cap
//!  ├─ 2. Extract   pdfium text layer or tesseract OCR (spawn_blocking)
//!  ├─ 3. Prompt    word-budgeted, optionally bullet-highlighted instruction
//!  ├─ 4. Generate  one LLM call (or the offline stub)
//!  └─ 5. Render    bullets + bold spans / plain copy text
//! ```
//!
//! Extraction runs as soon as a file is uploaded; generation only when asked.
//! [`Session`] holds that state machine for interactive use; the
//! [`summarize_file`] family runs it once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_tldr::{summarize_file, LengthTier, SummarizerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = SummarizerConfig::builder()
//!         .length(LengthTier::Short)
//!         .highlight(true)
//!         .build()?;
//!     let output = summarize_file("document.pdf", &config).await?;
//!     println!("{}", output.summary.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Interactive sessions
//!
//! ```rust,no_run
//! use edgequake_tldr::{LengthTier, Session, SummarizerConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::from_config(&SummarizerConfig::default())?;
//! session.upload_inputs(&["scan.png"]).await?;
//! session.generate().await?;
//! session.set_length(LengthTier::Long)?;
//! session.generate().await?;
//! println!("{}", session.copy_text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tldr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-tldr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LengthTier, SummarizerBackend, SummarizerConfig, SummarizerConfigBuilder};
pub use error::{ExtractionError, SummarizeError};
pub use output::{ExtractionOutcome, ExtractionResult, SummaryOutput, SummaryResult, SummaryStats};
pub use pipeline::extract::{OcrEngine, PdfTextSource, TextExtractor};
pub use pipeline::input::{FileId, MediaKind, UploadedFile};
pub use pipeline::llm::{Completion, LlmSummarizer, StubSummarizer, Summarizer};
pub use pipeline::render::{copy_text, render, to_ansi, Block, Span};
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use prompts::build_prompt;
pub use session::{Rejection, Session, SessionState, UploadReport};
pub use summarize::{extract_file, summarize_bytes, summarize_file, summarize_sync, summarize_to_file};
