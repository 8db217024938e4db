//! Text extraction: turn PDF bytes into plain text via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool so the
//! runtime's worker threads never stall on a large document.
//!
//! ## Library discovery
//!
//! pdfium is loaded dynamically. Lookup order:
//! 1. an explicit path given to [`PdfiumExtractor::with_library_path`]
//! 2. `PDFIUM_LIB_PATH` (either the library file or its directory) or a
//!    copy already cached by `pdfium-auto`
//! 3. the current directory
//! 4. the system library search path
//! 5. a one-time download into the `pdfium-auto` cache

use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Separator placed between the text of consecutive pages.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Why text could not be extracted from a document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The pdfium shared library could not be loaded.
    #[error("PDFium library unavailable: {0}. Set PDFIUM_LIB_PATH to the pdfium library or its directory.")]
    LibraryUnavailable(String),

    /// The document requires a password.
    #[error("PDF is password-protected")]
    PasswordProtected,

    /// The bytes could not be parsed as a PDF.
    #[error("invalid or corrupt PDF: {0}")]
    InvalidDocument(String),

    /// A page's text layer could not be read.
    #[error("failed to read text of page {page}: {detail}")]
    Page { page: usize, detail: String },

    /// The extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Extracts plain text from raw PDF bytes.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Return the text of every page, joined by [`BLOCK_SEPARATOR`].
    async fn extract(&self, pdf_bytes: Vec<u8>) -> Result<String, ExtractError>;
}

/// Join per-page text blocks the way every extractor must.
pub fn join_blocks<S: AsRef<str>>(blocks: &[S]) -> String {
    blocks
        .iter()
        .map(|b| b.as_ref())
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// [`TextExtractor`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the pdfium library at `path` (a file, or a directory holding the
    /// platform library).
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract(&self, pdf_bytes: Vec<u8>) -> Result<String, ExtractError> {
        let library_path = self.library_path.clone();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(library_path.as_deref())?;
            extract_blocking(&pdfium, &pdf_bytes)
        })
        .await
        .map_err(|e| ExtractError::Task(e.to_string()))?
    }
}

/// Load pdfium following the documented lookup order.
fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, ExtractError> {
    let unavailable = |e: pdfium_auto::PdfiumAutoError| ExtractError::LibraryUnavailable(e.to_string());

    if let Some(p) = library_path {
        return pdfium_auto::bind_pdfium_from_path(p).map_err(unavailable);
    }
    if let Some(p) = pdfium_auto::cached_pdfium_path() {
        return pdfium_auto::bind_pdfium_from_path(&p).map_err(unavailable);
    }

    let local = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library());
    match local {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(e) => {
            debug!("No local PDFium ({e}); fetching a copy");
            pdfium_auto::bind_pdfium_silent().map_err(unavailable)
        }
    }
}

/// Blocking implementation of text extraction.
fn extract_blocking(pdfium: &Pdfium, pdf_bytes: &[u8]) -> Result<String, ExtractError> {
    let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(|e| {
        let err_str = format!("{e:?}");
        if err_str.contains("Password") || err_str.contains("password") {
            ExtractError::PasswordProtected
        } else {
            ExtractError::InvalidDocument(err_str)
        }
    })?;

    let mut blocks = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| ExtractError::Page {
            page: idx + 1,
            detail: format!("{e:?}"),
        })?;
        blocks.push(text.all());
    }

    let joined = join_blocks(&blocks);
    if joined.trim().is_empty() {
        warn!("PDF has {} pages but no text layer", blocks.len());
    }
    debug!("Extracted {} chars from {} pages", joined.len(), blocks.len());
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_uses_blank_line() {
        assert_eq!(join_blocks(&["one", "two", "three"]), "one\n\ntwo\n\nthree");
    }

    #[test]
    fn join_single_and_empty() {
        assert_eq!(join_blocks(&["only"]), "only");
        assert_eq!(join_blocks::<&str>(&[]), "");
    }

    #[test]
    fn explicit_library_path_that_is_not_pdfium_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let bogus = dir.path().join("libpdfium.so");
        std::fs::write(&bogus, b"not a library").unwrap();

        let result = tokio_test::block_on(
            PdfiumExtractor::with_library_path(&bogus).extract(b"%PDF-1.4".to_vec()),
        );
        assert!(matches!(result, Err(ExtractError::LibraryUnavailable(_))));
    }

    #[test]
    fn library_error_mentions_env_var() {
        let e = ExtractError::LibraryUnavailable("LoadLibraryError".into());
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }

    struct EchoExtractor;

    #[async_trait]
    impl TextExtractor for EchoExtractor {
        async fn extract(&self, pdf_bytes: Vec<u8>) -> Result<String, ExtractError> {
            String::from_utf8(pdf_bytes).map_err(|e| ExtractError::InvalidDocument(e.to_string()))
        }
    }

    #[test]
    fn trait_object_is_usable() {
        let ex: std::sync::Arc<dyn TextExtractor> = std::sync::Arc::new(EchoExtractor);
        let text = tokio_test::block_on(ex.extract(b"plain".to_vec())).unwrap();
        assert_eq!(text, "plain");
    }
}
