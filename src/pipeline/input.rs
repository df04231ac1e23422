//! Intake: turn a path or URL into a validated [`UploadedFile`].
//!
//! The declared media type is decided here, once, and classified into the
//! closed [`MediaKind`] enumeration. Every later stage dispatches on that
//! tag instead of re-inspecting strings. Local files are checked against the
//! size cap from their metadata before the contents are read, so an
//! oversized upload never costs a full read.

use crate::error::SummarizeError;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier generated for each uploaded file, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u64);

impl FileId {
    fn next() -> Self {
        FileId(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        FileId(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of extractor a file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// `application/pdf`
    Pdf,
    /// `image/*`
    Image,
    /// Anything else.
    Unsupported,
}

impl MediaKind {
    /// Classify a declared media type. Parameters (`; charset=…`) are ignored.
    pub fn classify(media_type: &str) -> Self {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if essence == "application/pdf" {
            MediaKind::Pdf
        } else if essence.starts_with("image/") && essence.len() > "image/".len() {
            MediaKind::Image
        } else {
            MediaKind::Unsupported
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Pdf => "pdf",
            MediaKind::Image => "image",
            MediaKind::Unsupported => "unsupported",
        }
    }
}

/// A file selected by the user, held in memory for the session.
#[derive(Clone)]
pub struct UploadedFile {
    pub id: FileId,
    /// Display name; the user may rename it.
    pub name: String,
    /// Declared media type, e.g. `application/pdf`.
    pub media_type: String,
    /// Classification of `media_type`, fixed at construction.
    pub kind: MediaKind,
    /// Size of `bytes`.
    pub size: u64,
    pub bytes: Arc<[u8]>,
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .finish()
    }
}

impl UploadedFile {
    /// Wrap in-memory content with a fresh identifier. Does not validate.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let media_type = media_type.into();
        let bytes: Arc<[u8]> = bytes.into();
        Self {
            id: FileId::next(),
            name: name.into(),
            kind: MediaKind::classify(&media_type),
            size: bytes.len() as u64,
            media_type,
            bytes,
        }
    }

    /// Reject files over `max_bytes` or whose type is neither PDF nor image.
    pub fn validate(&self, max_bytes: u64) -> Result<(), SummarizeError> {
        if self.size > max_bytes {
            return Err(SummarizeError::FileTooLarge {
                name: self.name.clone(),
                size: self.size,
                limit: max_bytes,
            });
        }
        if self.kind == MediaKind::Unsupported {
            return Err(SummarizeError::UnsupportedMediaType {
                name: self.name.clone(),
                media_type: self.media_type.clone(),
            });
        }
        Ok(())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local path or download a URL.
pub async fn load_input(
    input: &str,
    max_bytes: u64,
    download_timeout_secs: u64,
) -> Result<UploadedFile, SummarizeError> {
    if input.trim().is_empty() {
        return Err(SummarizeError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        load_url(input, max_bytes, download_timeout_secs).await
    } else {
        load_file(input, max_bytes).await
    }
}

/// Read a local file, enforcing the size cap before reading its contents.
pub async fn load_file(path: impl AsRef<Path>, max_bytes: u64) -> Result<UploadedFile, SummarizeError> {
    let path = path.as_ref();
    let meta = tokio::fs::metadata(path).await.map_err(|e| io_error(path, e))?;
    if !meta.is_file() {
        return Err(SummarizeError::InvalidInput {
            input: path.display().to_string(),
        });
    }

    let name = display_name(path);
    if meta.len() > max_bytes {
        return Err(SummarizeError::FileTooLarge {
            name,
            size: meta.len(),
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    let media_type = media_type_for(&name, &bytes);
    debug!("Loaded '{}' ({} bytes, {})", name, bytes.len(), media_type);
    Ok(UploadedFile::new(name, media_type, bytes))
}

/// Download a URL. The declared type comes from `Content-Type` when the
/// server sends a specific one.
pub async fn load_url(url: &str, max_bytes: u64, timeout_secs: u64) -> Result<UploadedFile, SummarizeError> {
    info!("Downloading: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SummarizeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| download_error(url, timeout_secs, e))?;

    if !response.status().is_success() {
        return Err(SummarizeError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = filename_from_url(url);
    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(SummarizeError::FileTooLarge {
                name,
                size: len,
                limit: max_bytes,
            });
        }
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && v != "application/octet-stream");

    // Content-Length is optional (chunked bodies), so the cap is also
    // enforced while streaming.
    let bytes = collect_capped(response.bytes_stream(), &name, max_bytes, |e| {
        download_error(url, timeout_secs, e)
    })
    .await?;

    let media_type = header_type.unwrap_or_else(|| media_type_for(&name, &bytes));
    info!("Downloaded '{}' ({} bytes, {})", name, bytes.len(), media_type);
    Ok(UploadedFile::new(name, media_type, bytes))
}

/// Collect a body stream, failing as soon as more than `max_bytes` arrive.
async fn collect_capped<S, B, E>(
    body: S,
    name: &str,
    max_bytes: u64,
    on_error: impl Fn(E) -> SummarizeError,
) -> Result<Vec<u8>, SummarizeError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    futures::pin_mut!(body);
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(&on_error)?;
        let chunk = chunk.as_ref();
        let received = (buf.len() + chunk.len()) as u64;
        if received > max_bytes {
            debug!("'{}' passed {} bytes mid-download, aborting", name, max_bytes);
            return Err(SummarizeError::FileTooLarge {
                name: name.to_string(),
                size: received,
                limit: max_bytes,
            });
        }
        buf.extend_from_slice(chunk);
    }
    Ok(buf)
}

/// Declared media type from the file extension, falling back to magic bytes.
pub fn media_type_for(name: &str, bytes: &[u8]) -> String {
    media_type_from_extension(name)
        .unwrap_or_else(|| sniff_media_type(bytes))
        .to_string()
}

fn media_type_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mt = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        _ => return None,
    };
    Some(mt)
}

fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        "application/pdf"
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.starts_with(b"BM") {
        "image/bmp"
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        "image/tiff"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract a reasonable filename from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    "download".to_string()
}

fn io_error(path: &Path, e: std::io::Error) -> SummarizeError {
    let path = PathBuf::from(path);
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => SummarizeError::PermissionDenied { path },
        std::io::ErrorKind::NotFound => SummarizeError::FileNotFound { path },
        _ => SummarizeError::Internal(format!("reading {}: {}", path.display(), e)),
    }
}

fn download_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> SummarizeError {
    if e.is_timeout() {
        SummarizeError::DownloadTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        SummarizeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
