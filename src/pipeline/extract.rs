//! Text extraction: dispatch on [`MediaKind`] to the PDF or OCR engine.
//!
//! Both engines are blocking (pdfium is a C++ library, tesseract is a
//! subprocess), so each call runs inside `tokio::task::spawn_blocking` and
//! the async caller only sees a suspension point that resolves to an
//! [`ExtractionResult`].
//!
//! [`TextExtractor::extract`] never fails. Unsupported files yield
//! [`UNSUPPORTED_SENTINEL`] without touching either engine; engine errors are
//! logged and yield [`FAILED_SENTINEL`].

use crate::config::SummarizerConfig;
use crate::error::ExtractionError;
use crate::output::{ExtractionOutcome, ExtractionResult};
use crate::pipeline::input::{MediaKind, UploadedFile};
use crate::pipeline::ocr::TesseractOcr;
use crate::pipeline::pdf::PdfiumTextSource;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Page-indexed PDF text retrieval.
pub trait PdfTextSource: Send + Sync {
    /// Return the text content items of every page, in page order.
    fn page_items(&self, pdf: &[u8]) -> Result<Vec<Vec<String>>, ExtractionError>;
}

/// Image-to-text recognition.
pub trait OcrEngine: Send + Sync {
    /// Recognise the text in an encoded image (PNG, JPEG, GIF, …).
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError>;
}

/// Turns uploaded files into plain text.
#[derive(Clone)]
pub struct TextExtractor {
    pdf: Arc<dyn PdfTextSource>,
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(pdf: Arc<dyn PdfTextSource>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { pdf, ocr }
    }

    /// pdfium + tesseract, located as described in [`SummarizerConfig`].
    pub fn from_config(config: &SummarizerConfig) -> Self {
        let pdf = PdfiumTextSource::new(
            config.pdfium_library_path.clone(),
            config.password.clone(),
        );
        let ocr = TesseractOcr::new(config.tesseract_path.clone(), config.ocr_language.clone());
        Self::new(Arc::new(pdf), Arc::new(ocr))
    }

    /// Extract text from `file`. Sentinel text stands in for unsupported or
    /// unreadable input.
    pub async fn extract(&self, file: &UploadedFile) -> ExtractionResult {
        let start = Instant::now();
        info!("Extracting '{}' as {}", file.name, file.kind.as_str());

        let result = match file.kind {
            MediaKind::Unsupported => {
                debug!("'{}' has type '{}', no extractor", file.name, file.media_type);
                return ExtractionResult::unsupported(file.id, elapsed_ms(start));
            }
            MediaKind::Pdf => {
                let source = Arc::clone(&self.pdf);
                let bytes = Arc::clone(&file.bytes);
                run_blocking(move || source.page_items(&bytes).map(|pages| {
                    let count = pages.len();
                    (format_pages(&pages), count)
                }))
                .await
            }
            MediaKind::Image => {
                let engine = Arc::clone(&self.ocr);
                let bytes = Arc::clone(&file.bytes);
                run_blocking(move || engine.recognize(&bytes).map(|text| (text, 1))).await
            }
        };

        let duration_ms = elapsed_ms(start);
        match result {
            Ok((text, pages)) => {
                debug!(
                    "Extracted {} chars from '{}' in {}ms",
                    text.len(),
                    file.name,
                    duration_ms
                );
                ExtractionResult {
                    file_id: file.id,
                    text,
                    outcome: ExtractionOutcome::Extracted { pages },
                    duration_ms,
                }
            }
            Err(e) => {
                warn!("Error extracting text from '{}': {}", file.name, e);
                ExtractionResult::failed(file.id, e, duration_ms)
            }
        }
    }
}

/// Join each page's items with single spaces and emit every page under a
/// `--- Page i ---` marker surrounded by blank lines.
pub fn format_pages(pages: &[Vec<String>]) -> String {
    let mut out = String::new();
    for (i, items) in pages.iter().enumerate() {
        out.push_str(&format!("\n\n--- Page {} ---\n\n{}\n\n", i + 1, items.join(" ")));
    }
    out
}

async fn run_blocking<T, F>(f: F) -> Result<T, ExtractionError>
where
    F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractionError::TaskAborted {
            detail: e.to_string(),
        })?
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{FAILED_SENTINEL, UNSUPPORTED_SENTINEL};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPdf {
        calls: AtomicUsize,
        pages: Vec<Vec<String>>,
    }

    impl PdfTextSource for CountingPdf {
        fn page_items(&self, _pdf: &[u8]) -> Result<Vec<Vec<String>>, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pages.clone())
        }
    }

    #[derive(Default)]
    struct CountingOcr {
        calls: AtomicUsize,
        fail: bool,
    }

    impl OcrEngine for CountingOcr {
        fn recognize(&self, _image: &[u8]) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ExtractionError::ImageDecodeFailed {
                    detail: "truncated".into(),
                })
            } else {
                Ok("Recognised text".into())
            }
        }
    }

    fn pages(texts: &[&[&str]]) -> Vec<Vec<String>> {
        texts
            .iter()
            .map(|p| p.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn format_pages_marks_each_page() {
        let out = format_pages(&pages(&[&["Hello", "world"], &["Second"]]));
        assert_eq!(
            out,
            "\n\n--- Page 1 ---\n\nHello world\n\n\n\n--- Page 2 ---\n\nSecond\n\n"
        );
    }

    #[test]
    fn format_pages_empty_document() {
        assert_eq!(format_pages(&[]), "");
    }

    #[tokio::test]
    async fn unsupported_skips_both_engines() {
        let pdf = Arc::new(CountingPdf::default());
        let ocr = Arc::new(CountingOcr::default());
        let extractor = TextExtractor::new(pdf.clone(), ocr.clone());

        let file = UploadedFile::new(
            "notes.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            vec![b'P', b'K'],
        );
        let result = extractor.extract(&file).await;

        assert_eq!(result.text, UNSUPPORTED_SENTINEL);
        assert_eq!(result.file_id, file.id);
        assert_eq!(pdf.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pdf_goes_to_pdf_source() {
        let pdf = Arc::new(CountingPdf {
            pages: pages(&[&["A"], &["B"], &["C"]]),
            ..Default::default()
        });
        let ocr = Arc::new(CountingOcr::default());
        let extractor = TextExtractor::new(pdf.clone(), ocr.clone());

        let file = UploadedFile::new("doc.pdf", "application/pdf", b"%PDF".to_vec());
        let result = extractor.extract(&file).await;

        assert!(matches!(result.outcome, ExtractionOutcome::Extracted { pages: 3 }));
        assert_eq!(pdf.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ocr_failure_becomes_sentinel() {
        let pdf = Arc::new(CountingPdf::default());
        let ocr = Arc::new(CountingOcr {
            fail: true,
            ..Default::default()
        });
        let extractor = TextExtractor::new(pdf, ocr.clone());

        let file = UploadedFile::new("scan.png", "image/png", vec![0u8; 8]);
        let result = extractor.extract(&file).await;

        assert_eq!(result.text, FAILED_SENTINEL);
        assert!(matches!(result.outcome, ExtractionOutcome::Failed { .. }));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }
}
