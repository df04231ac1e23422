//! PDF text layer extraction via pdfium.
//!
//! pdfium merges adjacent text objects that share a line and font into
//! segments; each segment is one content item of the page. The library is
//! bound per call inside the blocking task, so no pdfium handle ever
//! crosses threads.

use crate::error::ExtractionError;
use crate::pipeline::extract::PdfTextSource;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// [`PdfTextSource`] backed by a dynamically loaded libpdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextSource {
    /// Library file or directory containing it. When unset, resolution is
    /// left to `pdfium_auto::bind_pdfium`.
    library_path: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumTextSource {
    pub fn new(library_path: Option<PathBuf>, password: Option<String>) -> Self {
        Self {
            library_path,
            password,
        }
    }

    /// Bind through `pdfium-auto`: the configured path is authoritative,
    /// otherwise `PDFIUM_LIB_PATH`, `./`, the download cache, the system
    /// library and finally a one-time download.
    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        pdfium_auto::bind_pdfium(self.library_path.as_deref(), None).map_err(|e| {
            ExtractionError::PdfiumUnavailable {
                detail: format!(
                    "{e}. Set PDFIUM_LIB_PATH to a libpdfium file or the directory holding it."
                ),
            }
        })
    }
}

impl PdfTextSource for PdfiumTextSource {
    fn page_items(&self, pdf: &[u8]) -> Result<Vec<Vec<String>>, ExtractionError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, self.password.as_deref())
            .map_err(|e| ExtractionError::PdfOpenFailed {
                detail: format!("{:?}", e),
            })?;

        let page_count = document.pages().len() as usize;
        info!("PDF loaded: {} pages", page_count);

        let mut pages = Vec::with_capacity(page_count);
        for (index, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| ExtractionError::PdfPageFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;
            let items: Vec<String> = text.segments().iter().map(|segment| segment.text()).collect();
            debug!("Page {}: {} text items", index + 1, items.len());
            pages.push(items);
        }

        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_configured_library_is_unavailable() {
        let source = PdfiumTextSource::new(Some(PathBuf::from("/no/such/libpdfium.so")), None);
        let err = source.page_items(b"%PDF-1.4").unwrap_err();
        assert!(
            matches!(err, ExtractionError::PdfiumUnavailable { ref detail } if detail.contains("/no/such")),
            "got {err:?}"
        );
    }
}
