//! Progress-callback trait for extraction and generation events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummarizerConfigBuilder::progress_callback`] to drive a
//! loading indicator. Text extraction (OCR in particular) can take seconds
//! and the LLM call has no upper bound, so front ends need to know when each
//! one starts and settles.
//!
//! # Example
//!
//! ```rust
//! use edgequake_tldr::{SummaryProgressCallback, SummarizerConfig};
//! use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
//!
//! struct Spinner {
//!     busy: AtomicBool,
//! }
//!
//! impl SummaryProgressCallback for Spinner {
//!     fn on_extraction_start(&self, _name: &str, _kind: &str) {
//!         self.busy.store(true, Ordering::SeqCst);
//!     }
//!     fn on_extraction_complete(&self, _name: &str, _chars: usize) {
//!         self.busy.store(false, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = SummarizerConfig::builder()
//!     .progress_callback(Arc::new(Spinner { busy: AtomicBool::new(false) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it extracts and summarises.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called before text extraction begins.
    ///
    /// # Arguments
    /// * `file_name` — display name of the file
    /// * `kind`      — "pdf", "image" or "unsupported"
    fn on_extraction_start(&self, file_name: &str, kind: &str) {
        let _ = (file_name, kind);
    }

    /// Called when extraction settles, including when it produced sentinel text.
    fn on_extraction_complete(&self, file_name: &str, text_len: usize) {
        let _ = (file_name, text_len);
    }

    /// Called just before the summariser is invoked.
    fn on_generation_start(&self, word_limit: usize, highlight: bool) {
        let _ = (word_limit, highlight);
    }

    /// Called when a summary was produced.
    fn on_generation_complete(&self, summary_len: usize) {
        let _ = summary_len;
    }

    /// Called when the summariser failed.
    fn on_generation_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummarizerConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        extractions: AtomicUsize,
        generations: AtomicUsize,
        errors: AtomicUsize,
    }

    impl SummaryProgressCallback for TrackingCallback {
        fn on_extraction_complete(&self, _file_name: &str, _text_len: usize) {
            self.extractions.fetch_add(1, Ordering::SeqCst);
        }

        fn on_generation_complete(&self, _summary_len: usize) {
            self.generations.fetch_add(1, Ordering::SeqCst);
        }

        fn on_generation_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start("a.pdf", "pdf");
        cb.on_extraction_complete("a.pdf", 10);
        cb.on_generation_start(50, true);
        cb.on_generation_complete(42);
        cb.on_generation_error("boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_extraction_complete("a.pdf", 10);
        tracker.on_generation_complete(12);
        tracker.on_generation_error("timeout");
        tracker.on_generation_complete(30);

        assert_eq!(tracker.extractions.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.generations.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
