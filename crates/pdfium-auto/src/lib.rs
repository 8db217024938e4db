//! # pdfium-auto
//!
//! Find a usable PDFium shared library for `pdfium-render`, fetching it on
//! first use when the machine has none.
//!
//! ## Resolution order
//!
//! [`ensure_pdfium_library`] returns the first of:
//!
//! 1. `PDFIUM_LIB_PATH`, when it names an existing library file or a directory
//!    holding the platform library
//! 2. the bundled copy (`bundled` feature), written to the cache on first use
//! 3. a previously cached download in [`pdfium_cache_dir`]
//! 4. a fresh download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    unpacked into the cache
//!
//! The resolved path is memoised for the life of the process.
//!
//! ## Environment variables
//!
//! - `PDFIUM_LIB_PATH`: existing pdfium library (file or directory)
//! - `PDFIUM_AUTO_CACHE_DIR`: cache root instead of the platform cache dir

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

#[cfg(feature = "bundled")]
mod bundled {
    include!(concat!(env!("OUT_DIR"), "/bundled.rs"));
}

/// pdfium-binaries release used for downloads (`chromium/<version>`).
pub const PDFIUM_VERSION: &str = "7690";

const RELEASE_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Directory name under the platform cache dir.
const CACHE_APP_DIR: &str = "pdf2md-cli";

/// Download progress: `(bytes_so_far, total_if_known)`.
pub type DownloadProgress<'a> = &'a dyn Fn(u64, Option<u64>);

#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    #[error("no prebuilt PDFium for {os}/{arch}; set PDFIUM_LIB_PATH")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("PDFium cache directory '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDFium download failed: {0}")]
    Download(String),

    #[error("PDFium archive extraction failed: {0}")]
    Extract(String),

    #[error("failed to load PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

// ── Platform table ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Platform {
    /// Release asset, e.g. `pdfium-linux-x64.tgz`.
    archive: &'static str,
    /// Library path inside the archive.
    member: &'static str,
    /// File name on disk.
    lib_name: &'static str,
}

fn platform_for(os: &str, arch: &str) -> Result<Platform, PdfiumAutoError> {
    const DYLIB: (&str, &str) = ("libpdfium.dylib", "lib/libpdfium.dylib");
    const SO: (&str, &str) = ("libpdfium.so", "lib/libpdfium.so");
    const DLL: (&str, &str) = ("pdfium.dll", "bin/pdfium.dll");

    let (archive, (lib_name, member)) = match (os, arch) {
        ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", DYLIB),
        ("macos", "x86_64") => ("pdfium-mac-x64.tgz", DYLIB),
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", SO),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", SO),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", DLL),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", DLL),
        ("windows", "x86") => ("pdfium-win-x86.tgz", DLL),
        _ => {
            return Err(PdfiumAutoError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };
    Ok(Platform {
        archive,
        member,
        lib_name,
    })
}

fn current_platform() -> Result<Platform, PdfiumAutoError> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

// ── Locations ────────────────────────────────────────────────────────────────

/// Versioned cache directory for the downloaded library.
///
/// `<cache dir>/pdf2md-cli/pdfium-<VERSION>`, or
/// `$PDFIUM_AUTO_CACHE_DIR/pdfium-<VERSION>` when set.
pub fn pdfium_cache_dir() -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    if let Some(root) = std::env::var_os("PDFIUM_AUTO_CACHE_DIR").filter(|v| !v.is_empty()) {
        return PathBuf::from(root).join(versioned);
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_APP_DIR)
        .join(versioned)
}

/// Turn a file-or-directory override into a library file path.
fn library_in(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

/// `PDFIUM_LIB_PATH`, if it points at something that exists.
fn env_override() -> Option<PathBuf> {
    let raw = std::env::var_os("PDFIUM_LIB_PATH").filter(|v| !v.is_empty())?;
    let lib = library_in(Path::new(&raw));
    if lib.exists() {
        Some(lib)
    } else {
        warn!("PDFIUM_LIB_PATH '{}' does not exist; ignoring it", lib.display());
        None
    }
}

/// The library path if it is already available without network access.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    if let Some(p) = env_override() {
        return Some(p);
    }
    let platform = current_platform().ok()?;
    let cached = pdfium_cache_dir().join(platform.lib_name);
    cached.exists().then_some(cached)
}

/// True when [`ensure_pdfium_library`] would not touch the network.
pub fn is_pdfium_cached() -> bool {
    cfg!(feature = "bundled") || cached_pdfium_path().is_some()
}

/// True when a pdfium library loads from the working directory or the
/// system search path.
pub fn local_pdfium_available() -> bool {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .is_ok()
}

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Make sure a PDFium library exists locally and return its path.
///
/// Downloads at most once per cache directory. `on_progress` is called while
/// bytes arrive; pass `None` for a silent download.
pub fn ensure_pdfium_library(
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = RESOLVED.get() {
        return Ok(path.clone());
    }
    let path = resolve(on_progress)?;
    Ok(RESOLVED.get_or_init(|| path).clone())
}

/// Resolve (downloading if needed) and bind in one step.
pub fn bind_pdfium(on_progress: Option<DownloadProgress<'_>>) -> Result<Pdfium, PdfiumAutoError> {
    let path = ensure_pdfium_library(on_progress)?;
    bind_pdfium_from_path(&path)
}

/// [`bind_pdfium`] without progress reporting.
pub fn bind_pdfium_silent() -> Result<Pdfium, PdfiumAutoError> {
    bind_pdfium(None)
}

/// Bind the library at `path`: a library file, or a directory containing the
/// platform library.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    let lib = library_in(path);
    Pdfium::bind_to_library(&lib)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: lib,
            reason: e.to_string(),
        })
}

// ── Internals ────────────────────────────────────────────────────────────────

fn resolve(on_progress: Option<DownloadProgress<'_>>) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(p) = env_override() {
        return Ok(p);
    }

    let platform = current_platform()?;
    let cache_dir = pdfium_cache_dir();
    let lib_path = cache_dir.join(platform.lib_name);
    if lib_path.exists() {
        debug!("Using cached PDFium at {}", lib_path.display());
        return Ok(lib_path);
    }

    std::fs::create_dir_all(&cache_dir).map_err(|source| PdfiumAutoError::CacheDir {
        path: cache_dir.clone(),
        source,
    })?;

    #[cfg(feature = "bundled")]
    {
        let _ = on_progress;
        install(&lib_path, bundled::PDFIUM_BYTES)?;
        info!("Unpacked bundled PDFium to {}", lib_path.display());
        Ok(lib_path)
    }

    #[cfg(not(feature = "bundled"))]
    {
        let url = release_url(&platform);
        info!("Downloading PDFium from {url}");
        let archive = download(&url, on_progress)?;
        let library = extract_member(&archive, platform.member)?;
        install(&lib_path, &library)?;
        info!("Cached PDFium at {}", lib_path.display());
        Ok(lib_path)
    }
}

#[cfg_attr(feature = "bundled", allow(dead_code))]
fn release_url(platform: &Platform) -> String {
    format!(
        "{RELEASE_BASE_URL}/chromium%2F{PDFIUM_VERSION}/{}",
        platform.archive
    )
}

/// Write `bytes` next to `dest` and rename into place, so concurrent
/// processes never load a half-written library.
fn install(dest: &Path, bytes: &[u8]) -> Result<(), PdfiumAutoError> {
    let tmp = dest.with_extension(format!("partial-{}", std::process::id()));
    let cache_err = |source| PdfiumAutoError::CacheDir {
        path: dest.to_path_buf(),
        source,
    };
    if let Err(e) = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, dest)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(cache_err(e));
    }
    Ok(())
}

#[cfg_attr(feature = "bundled", allow(dead_code))]
fn download(url: &str, on_progress: Option<DownloadProgress<'_>>) -> Result<Vec<u8>, PdfiumAutoError> {
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
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = [0u8; 64 * 1024];
    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfiumAutoError::Download(format!("read error: {e}"))),
        };
        body.extend_from_slice(&chunk[..n]);
        if let Some(cb) = on_progress {
            cb(body.len() as u64, total);
        }
    }
    Ok(body)
}

/// Pull a single member out of a `.tgz` archive.
#[cfg_attr(feature = "bundled", allow(dead_code))]
fn extract_member(archive: &[u8], member: &str) -> Result<Vec<u8>, PdfiumAutoError> {
    let extract_err = |e: std::io::Error| PdfiumAutoError::Extract(e.to_string());
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));

    for entry in tar.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        if entry.path().map_err(extract_err)? == Path::new(member) {
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes).map_err(extract_err)?;
            return Ok(bytes);
        }
    }
    Err(PdfiumAutoError::Extract(format!(
        "'{member}' not found in archive"
    )))
}
