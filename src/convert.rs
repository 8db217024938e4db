//! Conversion entry points: single file or directory fan-out.
//!
//! [`convert`] checks the input path and dispatches. Only a missing input,
//! or one that is neither a regular file nor a directory, is fatal. Every
//! other problem is recorded as a failed [`ConversionOutcome`] for that file,
//! and a directory batch always attempts every PDF it discovered.
//!
//! Files are processed strictly one after another. The only suspension points
//! are reading and extracting a PDF and the formatting call.

use crate::config::{ConversionConfig, ConversionMode};
use crate::error::{FileError, Pdf2MdError};
use crate::output::{ConversionOutcome, ConversionReport, InputKind};
use crate::pipeline::discover::discover_pdfs;
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::format::{GeminiFormatter, MarkdownFormatter};
use crate::pipeline::write::{default_output_path, write_markdown};
use crate::progress::{FileStage, ProgressCallback};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Warning recorded when an output path is supplied for directory input.
pub const OUTPUT_IGNORED_WARNING: &str =
    "output path is ignored when processing a directory; each PDF is written next to its source";

/// Classify `path` as a file or directory.
///
/// # Errors
/// - [`Pdf2MdError::InputNotFound`] when nothing exists at `path`
/// - [`Pdf2MdError::InputNotFileOrDirectory`] for sockets, fifos, devices…
pub fn classify_input(path: &Path) -> Result<InputKind, Pdf2MdError> {
    let meta = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Pdf2MdError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2MdError::Internal(format!("cannot access '{}': {e}", path.display()))
        }
    })?;

    if meta.is_file() {
        Ok(InputKind::File)
    } else if meta.is_dir() {
        Ok(InputKind::Directory)
    } else {
        Err(Pdf2MdError::InputNotFileOrDirectory {
            path: path.to_path_buf(),
        })
    }
}

/// Convert a PDF file, or every PDF below a directory, to Markdown.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionReport)` once every file was attempted, even if some
/// failed (check [`ConversionReport::failed`]).
///
/// # Errors
/// Returns `Err(Pdf2MdError)` only for fatal errors, before any file is
/// touched: missing input, input of an unsupported type, or an invalid
/// formatter setup.
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2MdError> {
    let input = input.as_ref();
    match classify_input(input)? {
        InputKind::File => convert_file(input, config).await,
        InputKind::Directory => convert_directory(input, config).await,
    }
}

/// Convert one PDF. `config.output` overrides the derived `.md` path.
pub async fn convert_file(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2MdError> {
    let input = input.as_ref();
    if classify_input(input)? != InputKind::File {
        return Err(Pdf2MdError::InvalidConfig(format!(
            "'{}' is a directory; use convert_directory",
            input.display()
        )));
    }

    info!("Starting conversion ({}): {}", config.mode, input.display());
    let pipeline = Pipeline::new(config)?;

    let mut report = ConversionReport::new(input, InputKind::File);
    let outcome = pipeline
        .process_file(input, config.output.as_deref(), 1, 1)
        .await;
    report.outcomes.push(outcome);
    Ok(report)
}

/// Convert every PDF below `dir`, writing each `.md` next to its source.
///
/// `config.output` is ignored here; supplying it adds a warning to the report.
pub async fn convert_directory(
    dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2MdError> {
    let dir = dir.as_ref();
    if classify_input(dir)? != InputKind::Directory {
        return Err(Pdf2MdError::InvalidConfig(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }

    let total_start = Instant::now();
    info!("Starting conversion ({}): {}", config.mode, dir.display());

    let mut report = ConversionReport::new(dir, InputKind::Directory);
    if let Some(ref ignored) = config.output {
        warn!("Ignoring output path {} for directory input", ignored.display());
        report.warnings.push(OUTPUT_IGNORED_WARNING.to_string());
    }

    let pipeline = Pipeline::new(config)?;

    let root = dir.to_path_buf();
    let pdfs = tokio::task::spawn_blocking(move || discover_pdfs(&root))
        .await
        .map_err(|e| Pdf2MdError::Internal(format!("Discovery task panicked: {e}")))?;
    let total = pdfs.len();

    if let Some(ref cb) = pipeline.progress {
        cb.on_batch_start(total);
    }

    if pdfs.is_empty() {
        info!("No PDF files found in {}", dir.display());
        return Ok(report);
    }
    info!("Found {} PDF files in {}", total, dir.display());

    for (i, pdf) in pdfs.iter().enumerate() {
        let outcome = pipeline.process_file(pdf, None, i + 1, total).await;
        report.outcomes.push(outcome);
    }

    let succeeded = report.succeeded();
    info!(
        "Batch complete: {}/{} files in {}ms",
        succeeded,
        total,
        total_start.elapsed().as_millis()
    );

    if let Some(ref cb) = pipeline.progress {
        cb.on_batch_complete(total, succeeded);
    }

    Ok(report)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2MdError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(input, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Collaborators and settings resolved once per invocation.
struct Pipeline {
    mode: ConversionMode,
    extractor: Arc<dyn TextExtractor>,
    /// Present only in AI mode.
    formatter: Option<Arc<dyn MarkdownFormatter>>,
    api_key: Option<String>,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    fn new(config: &ConversionConfig) -> Result<Self, Pdf2MdError> {
        let extractor = config
            .extractor
            .clone()
            .unwrap_or_else(|| Arc::new(PdfiumExtractor::new()));

        let (formatter, api_key) = match config.mode {
            ConversionMode::Standalone => (None, None),
            ConversionMode::Ai => {
                let formatter: Arc<dyn MarkdownFormatter> = match config.formatter {
                    Some(ref f) => Arc::clone(f),
                    None => Arc::new(
                        GeminiFormatter::from_config(config)
                            .map_err(|e| Pdf2MdError::InvalidConfig(e.to_string()))?,
                    ),
                };
                let api_key = config.resolve_api_key();
                if api_key.is_none() {
                    warn!("AI mode selected but no API key is configured");
                }
                (Some(formatter), api_key)
            }
        };

        Ok(Self {
            mode: config.mode,
            extractor,
            formatter,
            api_key,
            progress: config.progress_callback.clone(),
        })
    }

    fn stage(&self, path: &Path, stage: FileStage) {
        if let Some(ref cb) = self.progress {
            cb.on_file_stage(path, stage);
        }
    }

    /// Run one file through extract → (format) → write.
    ///
    /// Always returns an outcome; never propagates the error upward, so a
    /// single bad file doesn't abort the batch.
    async fn process_file(
        &self,
        path: &Path,
        output: Option<&Path>,
        index: usize,
        total: usize,
    ) -> ConversionOutcome {
        let start = Instant::now();
        if let Some(ref cb) = self.progress {
            cb.on_file_start(path, index, total);
        }

        let outcome = match self.run(path, output).await {
            Ok(written) => {
                info!(
                    "Converted {} → {} in {}ms",
                    path.display(),
                    written.display(),
                    start.elapsed().as_millis()
                );
                ConversionOutcome::success(path, written)
            }
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                ConversionOutcome::failure(e)
            }
        };

        if let Some(ref cb) = self.progress {
            cb.on_file_complete(&outcome);
        }
        outcome
    }

    async fn run(&self, path: &Path, output: Option<&Path>) -> Result<PathBuf, FileError> {
        // ── Step 1: Extract ──────────────────────────────────────────────
        self.stage(path, FileStage::Extracting);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FileError::ExtractionFailed {
                file: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let mut text = self
            .extractor
            .extract(bytes)
            .await
            .map_err(|e| FileError::ExtractionFailed {
                file: path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!("{}: extracted {} chars", path.display(), text.len());

        // ── Step 2: Format (AI mode only) ────────────────────────────────
        if self.mode == ConversionMode::Ai {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or_else(|| FileError::MissingCredential {
                    file: path.to_path_buf(),
                })?;
            let formatter = self
                .formatter
                .as_ref()
                .ok_or_else(|| FileError::FormattingFailed {
                    file: path.to_path_buf(),
                    message: "no formatter configured".to_string(),
                })?;

            self.stage(path, FileStage::Formatting);
            text = formatter
                .format(&text, api_key)
                .await
                .map_err(|e| FileError::FormattingFailed {
                    file: path.to_path_buf(),
                    message: e.to_string(),
                })?;
        }

        // ── Step 3: Write ────────────────────────────────────────────────
        let out = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(path));

        self.stage(path, FileStage::Writing);
        write_markdown(&out, &text)
            .await
            .map_err(|e| FileError::WriteFailed {
                file: path.to_path_buf(),
                message: format!("{}: {e}", out.display()),
            })?;

        Ok(out)
    }
}
