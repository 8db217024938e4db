//! Error types for the pdf2md-cli library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2MdError`]: **Fatal**: the invocation cannot proceed at all
//!   (input path missing, input is neither a file nor a directory, the
//!   credential store cannot be read or written). Returned as
//!   `Err(Pdf2MdError)` from the top-level `convert*` functions.
//!
//! * [`FileError`]: **Non-fatal**: a single PDF failed (extraction error,
//!   missing credential, formatting error, write error) but every other file
//!   in the batch is still attempted. Stored inside
//!   [`crate::output::ConversionOutcome`] so callers can inspect partial
//!   success rather than losing the whole batch to one bad file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2md-cli library.
///
/// Per-file failures use [`FileError`] and are stored in
/// [`crate::output::ConversionOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path does not exist.
    #[error("Input '{path}' not found.")]
    InputNotFound { path: PathBuf },

    /// Input exists but is a socket, fifo, device or similar.
    #[error("Input '{path}' is not a file or directory.")]
    InputNotFileOrDirectory { path: PathBuf },

    // ── Credential store errors ───────────────────────────────────────────
    /// No per-user configuration directory could be determined.
    #[error("Could not determine a configuration directory.\nSet PDF2MD_CONFIG_FILE to choose a location.")]
    ConfigDirUnavailable,

    /// The stored settings file exists but could not be read.
    #[error("Failed to read settings '{path}': {source}")]
    CredentialRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored settings file is not valid JSON.
    #[error("Settings file '{path}' is malformed: {detail}\nDelete it or run `pdf2md config --key <key>` to rewrite it.")]
    CredentialParse { path: PathBuf, detail: String },

    /// The settings file could not be created or written.
    #[error("Failed to write settings '{path}': {source}")]
    CredentialWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single file.
///
/// Stored alongside [`crate::output::ConversionOutcome`] when a file fails.
/// The batch continues with the next file.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The PDF could not be read or its text could not be extracted.
    #[error("Error processing {file:?}: {message}")]
    ExtractionFailed { file: PathBuf, message: String },

    /// AI mode was requested but no API key is available.
    #[error("API Key is required for AI mode. Use \"pdf2md config --key <key>\" or pass --api-key.")]
    MissingCredential { file: PathBuf },

    /// The generative model call failed.
    #[error("AI processing failed: {message}")]
    FormattingFailed { file: PathBuf, message: String },

    /// The Markdown could not be written to disk.
    #[error("Failed to write output for {file:?}: {message}")]
    WriteFailed { file: PathBuf, message: String },
}

impl FileError {
    /// The source PDF this error belongs to.
    pub fn file(&self) -> &PathBuf {
        match self {
            FileError::ExtractionFailed { file, .. }
            | FileError::MissingCredential { file }
            | FileError::FormattingFailed { file, .. }
            | FileError::WriteFailed { file, .. } => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_not_found_display() {
        let e = Pdf2MdError::InputNotFound {
            path: PathBuf::from("missing/report.pdf"),
        };
        let msg = e.to_string();
        assert!(msg.contains("missing/report.pdf"), "got: {msg}");
        assert!(msg.contains("not found"));
    }

    #[test]
    fn missing_credential_mentions_both_sources() {
        let e = FileError::MissingCredential {
            file: PathBuf::from("a.pdf"),
        };
        let msg = e.to_string();
        assert!(msg.contains("config --key"), "got: {msg}");
        assert!(msg.contains("--api-key"), "got: {msg}");
    }

    #[test]
    fn formatting_failed_carries_remote_message() {
        let e = FileError::FormattingFailed {
            file: PathBuf::from("a.pdf"),
            message: "API key not valid".into(),
        };
        assert!(e.to_string().ends_with("API key not valid"));
    }

    #[test]
    fn file_accessor_returns_source() {
        let e = FileError::WriteFailed {
            file: PathBuf::from("docs/b.pdf"),
            message: "read-only file system".into(),
        };
        assert_eq!(e.file(), &PathBuf::from("docs/b.pdf"));
    }
}
