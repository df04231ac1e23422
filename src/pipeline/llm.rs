//! Summarisation client: one interface, two configurations.
//!
//! [`LlmSummarizer`] sends the prompt to an `edgequake-llm` provider;
//! [`StubSummarizer`] returns a canned placeholder without touching the
//! network. Callers pick one through [`SummarizerConfig::backend`] and only
//! ever see `Arc<dyn Summarizer>`.
//!
//! Each generate action is a single attempt: no retry, no backoff. The
//! response is returned verbatim; nothing checks that the model honoured the
//! word budget or the bullet request.

use crate::config::{SummarizerBackend, SummarizerConfig};
use crate::error::SummarizeError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Model used when the caller names a provider but no model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Placeholder returned by [`StubSummarizer`].
pub const STUB_SUMMARY: &str = "**Offline preview.** This placeholder stands in for a generated summary.\n\
* Live summarization is disabled in this configuration.\n\
* Configure an LLM provider to summarize the document.";

/// Raw model output plus usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Turns a prompt into summary text.
pub trait Summarizer: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Send `prompt` and return the response text verbatim.
    fn summarize<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, SummarizeError>>;
}

/// [`Summarizer`] backed by a hosted LLM.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Option<Duration>,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout: None,
        }
    }

    /// Take prompt, sampling and timeout settings from `config`.
    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &SummarizerConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.api_timeout_secs.map(Duration::from_secs),
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl Summarizer for LlmSummarizer {
    fn name(&self) -> &str {
        "llm"
    }

    fn summarize<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, SummarizeError>> {
        async move {
            let start = Instant::now();
            let messages = vec![
                ChatMessage::system(self.system_prompt.as_str()),
                ChatMessage::user(prompt),
            ];
            let options = self.options();

            let call = self.provider.chat(&messages, Some(&options));
            let response = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                    SummarizeError::ApiTimeout {
                        secs: limit.as_secs(),
                    }
                })?,
                None => call.await,
            }
            .map_err(|e| {
                warn!("LLM call failed: {}", e);
                SummarizeError::LlmApiError {
                    message: format!("{}", e),
                }
            })?;

            debug!(
                "LLM: {} input tokens, {} output tokens, {:?}",
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );

            Ok::<_, SummarizeError>(Completion {
                text: response.content,
                input_tokens: response.prompt_tokens as usize,
                output_tokens: response.completion_tokens as usize,
            })
        }
        .boxed()
    }
}

/// Offline [`Summarizer`] that always returns [`STUB_SUMMARY`] (or a custom text).
#[derive(Debug, Clone)]
pub struct StubSummarizer {
    text: String,
}

impl StubSummarizer {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Default for StubSummarizer {
    fn default() -> Self {
        Self::with_text(STUB_SUMMARY)
    }
}

impl Summarizer for StubSummarizer {
    fn name(&self) -> &str {
        "stub"
    }

    fn summarize<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, SummarizeError>> {
        debug!("Stub summariser ignoring {}-char prompt", prompt.len());
        let completion = Completion {
            text: self.text.clone(),
            input_tokens: 0,
            output_tokens: 0,
        };
        futures::future::ready(Ok(completion)).boxed()
    }
}

/// Pick the summariser `config` asks for.
///
/// A pre-built [`SummarizerConfig::summarizer`] wins; otherwise the backend
/// decides between the stub and a live provider.
pub fn resolve_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>, SummarizeError> {
    if let Some(ref summarizer) = config.summarizer {
        return Ok(Arc::clone(summarizer));
    }
    match config.backend {
        SummarizerBackend::Stub => {
            info!("Using offline stub summariser");
            Ok(Arc::new(StubSummarizer::default()))
        }
        SummarizerBackend::Live => {
            let provider = resolve_provider(config)?;
            Ok(Arc::new(LlmSummarizer::from_config(provider, config)))
        }
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SummarizeError> {
    info!("Using LLM provider '{}' with model '{}'", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SummarizeError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **Gemini** when `GEMINI_API_KEY` is set.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
fn resolve_provider(config: &SummarizerConfig) -> Result<Arc<dyn LLMProvider>, SummarizeError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("gemini", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SummarizeError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or run with --offline.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_returns_canned_text() {
        let stub = StubSummarizer::default();
        let out = stub.summarize("anything").await.unwrap();
        assert_eq!(out.text, STUB_SUMMARY);
        assert_eq!(out.input_tokens, 0);
        assert_eq!(stub.name(), "stub");
    }

    #[test]
    fn stub_backend_resolves_without_network() {
        let config = SummarizerConfig::builder()
            .backend(SummarizerBackend::Stub)
            .build()
            .unwrap();
        let s = resolve_summarizer(&config).unwrap();
        assert_eq!(s.name(), "stub");
    }

    #[test]
    fn prebuilt_summarizer_wins() {
        let config = SummarizerConfig::builder()
            .summarizer(Arc::new(StubSummarizer::with_text("custom")))
            .build()
            .unwrap();
        let s = resolve_summarizer(&config).unwrap();
        let out = tokio_test::block_on(s.summarize("p")).unwrap();
        assert_eq!(out.text, "custom");
    }

    #[test]
    fn stub_summary_uses_render_markup() {
        assert!(STUB_SUMMARY.lines().any(|l| l.starts_with("* ")));
        assert!(STUB_SUMMARY.contains("**"));
    }
}
