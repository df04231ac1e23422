//! Configuration types for document summarisation.
//!
//! All pipeline behaviour is controlled through [`SummarizerConfig`], built
//! via its [`SummarizerConfigBuilder`]. One struct holds every knob: which
//! summariser backend to use, how to reach the LLM, where the PDF and OCR
//! engines live, and the upload limits enforced at intake.

use crate::error::SummarizeError;
use crate::pipeline::llm::Summarizer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default upload cap: 10 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Default OCR language model.
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Configuration for the summarisation pipeline.
///
/// Built via [`SummarizerConfig::builder()`] or using
/// [`SummarizerConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_tldr::{LengthTier, SummarizerConfig};
///
/// let config = SummarizerConfig::builder()
///     .length(LengthTier::Short)
///     .highlight(true)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SummarizerConfig {
    /// Live LLM calls or the offline canned placeholder. Default: Live.
    pub backend: SummarizerBackend,

    /// Pre-constructed summariser. Takes precedence over `backend`.
    pub summarizer: Option<Arc<dyn Summarizer>>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// LLM model identifier. If None, uses [`crate::pipeline::llm::DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Summaries should stay close to the source text; a low temperature keeps
    /// the model from embellishing.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate. Default: 1024.
    ///
    /// The longest tier asks for about 200 words, well under this budget.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in strict summariser prompt.
    pub system_prompt: Option<String>,

    /// Summary length tier used by one-shot summaries. Default: Medium.
    pub length: LengthTier,

    /// Ask the model for bullet key points and render bold spans. Default: false.
    pub highlight: bool,

    /// Upload size cap in bytes (inclusive). Default: 10 MiB.
    pub max_file_bytes: u64,

    /// Tesseract language model. Default: "eng".
    pub ocr_language: String,

    /// Path to the `tesseract` executable. If None, `TESSERACT_PATH` or `tesseract` on PATH.
    pub tesseract_path: Option<PathBuf>,

    /// Path to libpdfium (file or directory). If None, `PDFIUM_LIB_PATH` or the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-call LLM timeout in seconds. Default: None (wait until the call settles).
    pub api_timeout_secs: Option<u64>,

    /// Receives extraction and generation events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            backend: SummarizerBackend::default(),
            summarizer: None,
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.2,
            max_tokens: 1024,
            system_prompt: None,
            length: LengthTier::default(),
            highlight: false,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            tesseract_path: None,
            pdfium_library_path: None,
            password: None,
            download_timeout_secs: 120,
            api_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("backend", &self.backend)
            .field("summarizer", &self.summarizer.as_ref().map(|_| "<dyn Summarizer>"))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("length", &self.length)
            .field("highlight", &self.highlight)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("ocr_language", &self.ocr_language)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl SummarizerConfig {
    /// Create a new builder for `SummarizerConfig`.
    pub fn builder() -> SummarizerConfigBuilder {
        SummarizerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SummarizerConfig`].
#[derive(Debug)]
pub struct SummarizerConfigBuilder {
    config: SummarizerConfig,
}

impl SummarizerConfigBuilder {
    pub fn backend(mut self, backend: SummarizerBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.config.summarizer = Some(summarizer);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
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

    pub fn length(mut self, tier: LengthTier) -> Self {
        self.config.length = tier;
        self
    }

    pub fn highlight(mut self, v: bool) -> Self {
        self.config.highlight = v;
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummarizerConfig, SummarizeError> {
        let c = &self.config;
        if c.max_file_bytes == 0 {
            return Err(SummarizeError::InvalidConfig(
                "Upload limit must be at least 1 byte".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(SummarizeError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(SummarizeError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which summariser implementation the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SummarizerBackend {
    /// Call the configured LLM provider. (default)
    #[default]
    Live,
    /// Return a fixed placeholder summary without touching the network.
    Stub,
}

/// Summary length category, mapped to an advisory word budget.
///
/// | Tier | Words | Roughly |
/// |------|-------|---------|
/// | Short | 50 | 2–3 sentences |
/// | Medium | 100 | 4–5 sentences (default) |
/// | Long | 200 | 6–8 sentences |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthTier {
    Short,
    #[default]
    Medium,
    Long,
}

impl LengthTier {
    pub const ALL: [LengthTier; 3] = [LengthTier::Short, LengthTier::Medium, LengthTier::Long];

    /// Word budget embedded in the prompt. Not enforced on the response.
    pub fn word_limit(self) -> usize {
        match self {
            LengthTier::Short => 50,
            LengthTier::Medium => 100,
            LengthTier::Long => 200,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LengthTier::Short => "short",
            LengthTier::Medium => "medium",
            LengthTier::Long => "long",
        }
    }
}

impl fmt::Display for LengthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LengthTier {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" | "s" => Ok(LengthTier::Short),
            "medium" | "m" => Ok(LengthTier::Medium),
            "long" | "l" => Ok(LengthTier::Long),
            other => Err(SummarizeError::InvalidConfig(format!(
                "unknown length '{other}' (expected short, medium or long)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_limits_follow_tiers() {
        assert_eq!(LengthTier::Short.word_limit(), 50);
        assert_eq!(LengthTier::Medium.word_limit(), 100);
        assert_eq!(LengthTier::Long.word_limit(), 200);
    }

    #[test]
    fn length_tier_parses_case_insensitively() {
        assert_eq!("SHORT".parse::<LengthTier>().unwrap(), LengthTier::Short);
        assert_eq!(" long ".parse::<LengthTier>().unwrap(), LengthTier::Long);
        assert!("tiny".parse::<LengthTier>().is_err());
    }

    #[test]
    fn defaults() {
        let c = SummarizerConfig::default();
        assert_eq!(c.length, LengthTier::Medium);
        assert_eq!(c.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(c.ocr_language, "eng");
        assert_eq!(c.backend, SummarizerBackend::Live);
        assert!(c.api_timeout_secs.is_none());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = SummarizerConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_zero_upload_limit() {
        assert!(SummarizerConfig::builder().max_file_bytes(0).build().is_err());
    }

    #[test]
    fn builder_rejects_blank_ocr_language() {
        assert!(SummarizerConfig::builder().ocr_language("  ").build().is_err());
    }
}
