//! OCR via the `tesseract` executable.
//!
//! The image is decoded first so malformed uploads fail fast with a decode
//! error, then re-encoded as PNG into a temp file: tesseract's own format
//! support depends on how leptonica was built, PNG always works.

use crate::error::ExtractionError;
use crate::pipeline::extract::OcrEngine;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// [`OcrEngine`] that shells out to `tesseract <image> stdout -l <lang>`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    /// `binary` falls back to `TESSERACT_PATH`, then `tesseract` on PATH.
    pub fn new(binary: Option<PathBuf>, language: impl Into<String>) -> Self {
        let binary = binary
            .or_else(|| std::env::var_os("TESSERACT_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("tesseract"));
        Self {
            binary,
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError> {
        let png = normalise_to_png(image)?;

        let tmp = tempfile::Builder::new()
            .prefix("tldr-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractionError::Io {
                detail: format!("temp file: {e}"),
            })?;
        std::fs::write(tmp.path(), &png).map_err(|e| ExtractionError::Io {
            detail: format!("temp file write: {e}"),
        })?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| ExtractionError::OcrFailed {
                detail: format!("failed to run {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("tesseract exited with {}: {}", output.status, stderr.trim());
            return Err(ExtractionError::OcrFailed {
                detail: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("OCR recognised {} chars", text.len());
        Ok(text)
    }
}

/// Decode any supported image format and re-encode it as PNG.
pub fn normalise_to_png(image: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let decoded = image::load_from_memory(image).map_err(|e| ExtractionError::ImageDecodeFailed {
        detail: e.to_string(),
    })?;
    debug!("Decoded image {}x{}", decoded.width(), decoded.height());

    let mut buf = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractionError::ImageDecodeFailed {
            detail: format!("PNG re-encode: {e}"),
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn encoded(format: image::ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 10, 10])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format)
            .expect("encode test image");
        buf
    }

    fn jpeg_bytes() -> Vec<u8> {
        encoded(image::ImageFormat::Jpeg)
    }

    /// Stand-in tesseract: prints a line only when handed a non-empty PNG.
    #[cfg(unix)]
    fn fake_tesseract(dir: &std::path::Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("tesseract");
        std::fs::write(
            &script,
            "#!/bin/sh\ncase \"$1\" in *.png) [ -s \"$1\" ] && [ \"$2\" = stdout ] && echo \"page text ($4)\" && exit 0;; esac\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[test]
    fn normalise_converts_jpeg_to_png() {
        let png = normalise_to_png(&jpeg_bytes()).expect("normalise should succeed");
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn normalise_accepts_every_listed_image_format() {
        for format in [
            image::ImageFormat::Bmp,
            image::ImageFormat::Tiff,
            image::ImageFormat::WebP,
            image::ImageFormat::Gif,
        ] {
            let png = normalise_to_png(&encoded(format))
                .unwrap_or_else(|e| panic!("{format:?} should decode: {e}"));
            assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"), "{format:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn bmp_upload_reaches_tesseract() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = TesseractOcr::new(Some(fake_tesseract(dir.path())), "eng");

        let text = ocr.recognize(&encoded(image::ImageFormat::Bmp)).expect("OCR should run");
        assert_eq!(text.trim(), "page text (eng)");
    }

    #[test]
    fn normalise_rejects_garbage() {
        let err = normalise_to_png(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ExtractionError::ImageDecodeFailed { .. }));
    }

    #[test]
    fn missing_binary_is_an_ocr_failure() {
        let ocr = TesseractOcr::new(Some(PathBuf::from("/nonexistent/tesseract-bin")), "eng");
        let err = ocr.recognize(&jpeg_bytes()).unwrap_err();
        assert!(matches!(err, ExtractionError::OcrFailed { .. }), "got {err:?}");
    }

    #[test]
    fn explicit_language_is_kept() {
        let ocr = TesseractOcr::new(None, "deu");
        assert_eq!(ocr.language(), "deu");
    }
}
