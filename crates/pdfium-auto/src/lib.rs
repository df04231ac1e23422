//! # pdfium-auto
//!
//! Find a [PDFium](https://pdfium.googlesource.com/pdfium/) shared library
//! for `pdfium-render`, downloading and caching one when the machine has none.
//!
//! ## Resolution order
//!
//! [`bind_pdfium`] and [`ensure_pdfium_library`] try, first match wins:
//!
//! 1. the path given by the caller (a library file or the directory holding it);
//! 2. `PDFIUM_LIB_PATH` (file or directory);
//! 3. the platform library in the working directory (`./libpdfium.so` …);
//! 4. the per-version cache directory, see [`pdfium_cache_dir`];
//! 5. the system library ([`bind_pdfium`] only);
//! 6. a download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//!    into the cache directory.
//!
//! An explicit caller path is authoritative: if it does not exist the call
//! fails instead of falling through. A stale `PDFIUM_LIB_PATH` only logs a
//! warning. Once the download step has run, later calls in the same process
//! reuse its result without touching the network.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdfium_auto::{bind_pdfium, ensure_pdfium_library};
//!
//! // Bind, downloading silently on first use.
//! let pdfium = bind_pdfium(None, None).expect("PDFium unavailable");
//!
//! // Or fetch ahead of time with progress reporting.
//! let path = ensure_pdfium_library(None, Some(&|downloaded, total| {
//!     if let Some(t) = total {
//!         eprint!("\rDownloading PDFium: {downloaded}/{t} bytes");
//!     }
//! })).expect("download failed");
//! ```
//!
//! ## Environment variable overrides
//!
//! - `PDFIUM_LIB_PATH` — existing pdfium library (or its directory).
//! - `PDFIUM_AUTO_CACHE_DIR` — replaces the default cache root.
//! - `PDFIUM_AUTO_NO_DOWNLOAD` — when set, never download; resolution stops
//!   with [`PdfiumAutoError::NotFound`].

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Public constants ─────────────────────────────────────────────────────────

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

/// GitHub release base URL.
const BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Download progress: `(bytes_downloaded, total_bytes)`.
pub type DownloadProgress<'a> = &'a dyn Fn(u64, Option<u64>);

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// An explicit library path does not exist, or downloads are disabled.
    #[error("PDFium library not found: {0}")]
    NotFound(String),

    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    #[error("Download failed: {0}")]
    Download(String),

    /// gzip/tar extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

// ── Platform metadata ────────────────────────────────────────────────────────

struct PlatformInfo {
    /// Asset filename in the GitHub release, e.g. `pdfium-linux-x64.tgz`.
    archive_name: &'static str,
    /// Relative path inside the archive.
    lib_path_in_archive: &'static str,
    lib_name: &'static str,
}

fn detect_platform() -> Result<PlatformInfo, PdfiumAutoError> {
    let (archive_name, lib_path_in_archive, lib_name) =
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
            ("macos", "x86_64") => ("pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
            ("linux", "x86_64") => ("pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
            ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
            ("windows", "x86_64") => ("pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
            ("windows", "aarch64") => ("pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
            ("windows", "x86") => ("pdfium-win-x86.tgz", "bin/pdfium.dll", "pdfium.dll"),
            (os, arch) => {
                return Err(PdfiumAutoError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
    Ok(PlatformInfo {
        archive_name,
        lib_path_in_archive,
        lib_name,
    })
}

// ── Paths ────────────────────────────────────────────────────────────────────

/// Library file for `path`: directories get the platform library name appended.
pub fn library_in(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

/// Per-version cache directory for the downloaded library.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/edgequake-tldr/pdfium-{VERSION}/`
/// - **Linux**: `~/.cache/edgequake-tldr/pdfium-{VERSION}/`
/// - **Windows**: `%LOCALAPPDATA%\edgequake-tldr\pdfium-{VERSION}\`
///
/// `PDFIUM_AUTO_CACHE_DIR` replaces the root.
pub fn pdfium_cache_dir() -> PathBuf {
    let version_dir = format!("pdfium-{PDFIUM_VERSION}");
    if let Some(root) = std::env::var_os("PDFIUM_AUTO_CACHE_DIR") {
        return PathBuf::from(root).join(version_dir);
    }

    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("edgequake-tldr")
        .join(version_dir)
}

/// Existing library found without network access, if any.
///
/// Checks `configured`, `PDFIUM_LIB_PATH`, the working directory and the
/// cache directory, in that order. The system library is not probed.
pub fn locate_library(configured: Option<&Path>) -> Option<PathBuf> {
    let env = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    let working = Pdfium::pdfium_platform_library_name_at_path("./");
    let cached = detect_platform()
        .ok()
        .map(|info| pdfium_cache_dir().join(info.lib_name));

    configured
        .map(library_in)
        .into_iter()
        .chain(env.as_deref().map(library_in))
        .chain(std::iter::once(working))
        .chain(cached)
        .find(|p| p.is_file())
}

/// `true` when [`locate_library`] would succeed without a download.
pub fn is_pdfium_cached() -> bool {
    locate_library(None).is_some()
}

/// `true` when [`bind_pdfium`] would succeed without a download: a local
/// library exists or the system one loads.
pub fn is_pdfium_available() -> bool {
    is_pdfium_cached() || Pdfium::bind_to_system_library().is_ok()
}

// ── Public API ───────────────────────────────────────────────────────────────

static DOWNLOADED_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Returns a path to a usable PDFium library, downloading it if needed.
///
/// See the crate docs for the resolution order. `on_progress` receives
/// `(bytes_downloaded, total_bytes)` during a download.
///
/// Safe to call from several threads; concurrent first calls may each
/// download, and the first to finish wins the process-wide slot.
pub fn ensure_pdfium_library(
    configured: Option<&Path>,
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<PathBuf, PdfiumAutoError> {
    check_configured(configured)?;
    if let Some(path) = locate_library(configured) {
        return Ok(path);
    }
    warn_stale_env();
    download_once(on_progress)
}

/// Binds to PDFium, downloading it first if nothing local is usable.
pub fn bind_pdfium(
    configured: Option<&Path>,
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<Pdfium, PdfiumAutoError> {
    check_configured(configured)?;
    if let Some(path) = locate_library(configured) {
        return bind_pdfium_from_path(&path);
    }
    if let Ok(bindings) = Pdfium::bind_to_system_library() {
        debug!("Bound system PDFium library");
        return Ok(Pdfium::new(bindings));
    }
    warn_stale_env();
    let path = download_once(on_progress)?;
    bind_pdfium_from_path(&path)
}

/// Binds to the PDFium library at `path` (file or directory).
///
/// Does not interact with the download / cache layer.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    let lib = library_in(path);
    debug!("Binding PDFium from {}", lib.display());
    Pdfium::bind_to_library(&lib)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: lib,
            reason: e.to_string(),
        })
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn check_configured(configured: Option<&Path>) -> Result<(), PdfiumAutoError> {
    match configured.map(library_in) {
        Some(lib) if !lib.is_file() => Err(PdfiumAutoError::NotFound(format!(
            "configured path '{}' does not exist",
            lib.display()
        ))),
        _ => Ok(()),
    }
}

fn warn_stale_env() {
    if let Some(p) = std::env::var_os("PDFIUM_LIB_PATH") {
        warn!(
            "PDFIUM_LIB_PATH '{}' has no PDFium library; falling back to download",
            Path::new(&p).display()
        );
    }
}

fn download_once(on_progress: Option<DownloadProgress<'_>>) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = DOWNLOADED_PATH.get() {
        return Ok(path.clone());
    }
    if std::env::var_os("PDFIUM_AUTO_NO_DOWNLOAD").is_some() {
        return Err(PdfiumAutoError::NotFound(
            "no local library and PDFIUM_AUTO_NO_DOWNLOAD is set".to_string(),
        ));
    }

    let info = detect_platform()?;
    let cache_dir = pdfium_cache_dir();
    let lib_path = cache_dir.join(info.lib_name);

    let url = format!("{BASE_URL}/chromium%2F{PDFIUM_VERSION}/{}", info.archive_name);
    info!("Downloading PDFium {} from {}", PDFIUM_VERSION, url);

    std::fs::create_dir_all(&cache_dir).map_err(PdfiumAutoError::CacheDir)?;
    let archive = download_bytes(&url, on_progress)?;
    extract_library(&archive, info.lib_path_in_archive, &lib_path)?;
    info!("PDFium cached at {}", lib_path.display());

    let _ = DOWNLOADED_PATH.set(lib_path.clone());
    Ok(lib_path)
}

/// Streams a URL into memory, reporting progress every 64 KiB chunk.
fn download_bytes(
    url: &str,
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(32 * 1024 * 1024) as usize);
    let mut chunk = vec![0u8; 64 * 1024];
    let mut downloaded: u64 = 0;

    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                if let Some(cb) = on_progress {
                    cb(downloaded, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfiumAutoError::Download(format!("Read error: {e}"))),
        }
    }

    Ok(buf)
}

/// Unpacks the single entry `lib_path_in_archive` of a `.tgz` into `dest_path`.
fn extract_library(
    archive_bytes: &[u8],
    lib_path_in_archive: &str,
    dest_path: &Path,
) -> Result<(), PdfiumAutoError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let mut archive = Archive::new(GzDecoder::new(archive_bytes));
    let entries = archive
        .entries()
        .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;
        let matches = entry
            .path()
            .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?
            .to_string_lossy()
            .trim_start_matches("./")
            == lib_path_in_archive;
        if matches {
            entry
                .unpack(dest_path)
                .map_err(|e| PdfiumAutoError::Extract(format!("Unpack failed: {e}")))?;
            return Ok(());
        }
    }

    Err(PdfiumAutoError::Extract(format!(
        "Library '{lib_path_in_archive}' not found in archive"
    )))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tgz_with(entry_name: &str, contents: &[u8]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, entry_name, contents)
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn detect_platform_is_supported() {
        let info = detect_platform().expect("current platform should be supported");
        assert!(info.archive_name.ends_with(".tgz"));
        assert!(info.lib_path_in_archive.ends_with(info.lib_name));
    }

    #[test]
    fn cache_dir_is_versioned() {
        let d = pdfium_cache_dir();
        assert_eq!(d, pdfium_cache_dir());
        assert!(d.to_string_lossy().contains(PDFIUM_VERSION));
    }

    #[test]
    fn directory_resolves_to_platform_library() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library_in(dir.path());
        assert_eq!(lib.parent(), Some(dir.path()));
        assert_eq!(lib, Pdfium::pdfium_platform_library_name_at_path(dir.path()));
    }

    #[test]
    fn configured_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("custom-pdfium.so");
        std::fs::write(&lib, b"not really a library").unwrap();

        assert_eq!(locate_library(Some(&lib)), Some(lib.clone()));
        assert_eq!(ensure_pdfium_library(Some(&lib), None).unwrap(), lib);
    }

    #[test]
    fn configured_directory_is_searched() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Pdfium::pdfium_platform_library_name_at_path(dir.path());
        std::fs::write(&lib, b"stub").unwrap();

        assert_eq!(locate_library(Some(dir.path())), Some(lib));
    }

    #[test]
    fn missing_configured_path_does_not_fall_through() {
        let err = ensure_pdfium_library(Some(Path::new("/no/such/libpdfium.so")), None).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::NotFound(_)), "got {err:?}");

        let err = bind_pdfium(Some(Path::new("/no/such/libpdfium.so")), None).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn binding_a_non_library_fails() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("garbage.so");
        std::fs::write(&lib, b"garbage").unwrap();

        let err = bind_pdfium_from_path(&lib).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::Bind { .. }), "got {err:?}");
    }

    #[test]
    fn extracts_named_entry_from_archive() {
        let archive = tgz_with("lib/libpdfium.so", b"ELF-ish");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");

        extract_library(&archive, "lib/libpdfium.so", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"ELF-ish");
    }

    #[test]
    fn archive_without_library_is_an_error() {
        let archive = tgz_with("include/fpdfview.h", b"/* header */");
        let dir = tempfile::tempdir().unwrap();

        let err = extract_library(&archive, "lib/libpdfium.so", &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::Extract(_)));
    }
}
