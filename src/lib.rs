//! # pdf2md-cli
//!
//! Convert PDF files to Markdown, either by plain text extraction or by
//! passing the extracted text through a Gemini model that rewrites it as
//! structured Markdown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input path
//!  │
//!  ├─ 0. Classify  file │ directory │ fatal error
//!  ├─ 1. Discover  directory only: every *.pdf below it, sorted
//!  ├─ 2. Extract   pdfium text, pages joined by blank lines
//!  ├─ 3. Format    ai mode only: Gemini generateContent
//!  ├─ 4. Write     <input>.md (or --output for a single file)
//!  └─ 5. Report    one ConversionOutcome per file
//! ```
//!
//! A failure in steps 2–4 is recorded for that file only; the rest of a
//! directory batch still runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_cli::{convert, ConversionConfig, ConversionMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .mode(ConversionMode::Ai)
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let report = convert("papers/", &config).await?;
//!     eprintln!("{}/{} converted", report.succeeded(), report.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2md-cli = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod credentials;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ConversionMode};
pub use convert::{classify_input, convert, convert_directory, convert_file, convert_sync};
pub use credentials::{mask_secret, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{FileError, Pdf2MdError};
pub use output::{ConversionOutcome, ConversionReport, InputKind};
pub use pipeline::extract::{ExtractError, PdfiumExtractor, TextExtractor};
pub use pipeline::format::{FormatError, GeminiFormatter, MarkdownFormatter};
pub use progress::{ConversionProgressCallback, FileStage, NoopProgressCallback, ProgressCallback};
