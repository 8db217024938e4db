//! CLI binary for pdf2md-cli.
//!
//! A thin shim over the library crate: maps CLI flags to
//! `ConversionConfig`, manages the stored API key and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_cli::config::DEFAULT_MODEL;
use pdf2md_cli::{
    classify_input, convert, mask_secret, ConversionConfig, ConversionMode, ConversionOutcome,
    ConversionProgressCallback, CredentialStore, FileCredentialStore, FileStage, InputKind,
    ProgressCallback,
};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner per file while it is in flight,
/// replaced by a ✓/✗ line when it finishes.
struct CliProgressCallback {
    /// Input path, echoed in the batch header.
    input: PathBuf,
    /// Whether to animate a spinner (off for `--no-progress` or non-TTY use).
    spinners: bool,
    /// Spinner for the file currently being processed.
    current: Mutex<Option<ProgressBar>>,
    /// Count of files that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(input: &Path, spinners: bool) -> Arc<Self> {
        Arc::new(Self {
            input: input.to_path_buf(),
            spinners,
            current: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn spinner(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        if total_files > 0 {
            eprintln!(
                "{} {}",
                cyan("◆"),
                bold(&format!(
                    "Found {total_files} PDF files in {}",
                    self.input.display()
                ))
            );
        }
    }

    fn on_file_start(&self, path: &Path, _index: usize, _total: usize) {
        if !self.spinners {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_message(format!("Processing {}…", display_name(path)));
        bar.enable_steady_tick(Duration::from_millis(80));
        *self.spinner() = Some(bar);
    }

    fn on_file_stage(&self, path: &Path, stage: FileStage) {
        if stage != FileStage::Formatting {
            return;
        }
        if let Some(ref bar) = *self.spinner() {
            bar.set_message(format!(
                "Generative AI processing for {}…",
                display_name(path)
            ));
        }
    }

    fn on_file_complete(&self, outcome: &ConversionOutcome) {
        if let Some(bar) = self.spinner().take() {
            bar.finish_and_clear();
        }

        match (&outcome.output, outcome.error_message()) {
            (Some(out), None) => {
                eprintln!("{} Saved to {}", green("✓"), out.display());
            }
            (_, Some(msg)) => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                eprintln!("{} {}", red("✗"), red(&msg));
            }
            (None, None) => {}
        }
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        let summary = format!("Completed! {success_count}/{total_files} files processed.");
        if failed == 0 {
            eprintln!("\n{}", green(&summary));
        } else {
            eprintln!(
                "\n{}  {}",
                if failed == total_files {
                    red(&summary)
                } else {
                    yellow(&summary)
                },
                dim(&format!("({failed} failed)"))
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Plain text extraction (writes document.md next to the PDF)
  pdf2md document.pdf

  # Reformat with Gemini
  pdf2md document.pdf --mode ai

  # Choose the output file (single file only)
  pdf2md document.pdf -o notes/document.md

  # Convert a whole tree of PDFs
  pdf2md docs/ --mode ai --api-key YOUR_KEY

  # Store the API key once
  pdf2md config --key YOUR_KEY
  pdf2md config --show
  pdf2md config --delete

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Gemini API key (used when --api-key is absent)
  PDF2MD_MODEL            Override model ID
  PDF2MD_CONFIG_FILE      Location of the stored-settings file
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  PDFIUM_AUTO_CACHE_DIR   Where the downloaded PDF engine is cached
  RUST_LOG                Log filter, e.g. pdf2md_cli=debug
"#;

/// Convert PDFs to Markdown by text extraction or Gemini reformatting.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md",
    version,
    about = "Convert PDFs to Markdown by text extraction or Gemini reformatting",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a PDF file or a directory of PDFs (default command).
    Convert(ConvertArgs),
    /// Configure the stored Gemini API key.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input PDF file or directory.
    input: PathBuf,

    /// standalone (text extraction) or ai (Gemini formatting).
    #[arg(short, long, env = "PDF2MD_MODE", value_enum, default_value = "standalone")]
    mode: ModeArg,

    /// Output file path (single file input only).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Gemini API key (overrides the stored key).
    #[arg(short = 'k', long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model ID.
    #[arg(long, env = "PDF2MD_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Per-file formatting timeout in seconds.
    #[arg(long, env = "PDF2MD_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Disable spinners.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Set the Gemini API key.
    #[arg(short, long, value_parser = non_blank)]
    key: Option<String>,

    /// Delete the stored API key.
    #[arg(short, long)]
    delete: bool,

    /// Show the current API key (masked).
    #[arg(short, long)]
    show: bool,
}

fn non_blank(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Err("the API key must not be empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Standalone,
    Ai,
}

impl From<ModeArg> for ConversionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Standalone => ConversionMode::Standalone,
            ModeArg::Ai => ConversionMode::Ai,
        }
    }
}

/// Insert `convert` when the first argument isn't a subcommand or a
/// top-level flag, making `pdf2md file.pdf` equivalent to
/// `pdf2md convert file.pdf`.
fn with_default_subcommand(mut args: Vec<OsString>) -> Vec<OsString> {
    const PASSTHROUGH: &[&str] = &["convert", "config", "help", "-h", "--help", "-V", "--version"];

    let insert = match args.get(1) {
        None => false,
        Some(first) => first.to_str().map_or(true, |s| !PASSTHROUGH.contains(&s)),
    };
    if insert {
        args.insert(1, OsString::from("convert"));
    }
    args
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse_from(with_default_subcommand(std::env::args_os().collect()));

    match cli.command {
        Command::Config(args) => run_config(args, &mut io::stdout()),
        Command::Convert(args) => {
            init_logging(args.verbose, !args.no_progress);
            run_convert(args, &mut io::stderr()).await
        }
    }
}

/// Install the stderr tracing subscriber. `RUST_LOG` overrides the default.
fn init_logging(verbose: bool, show_progress: bool) {
    // Suppress INFO-level library logs when spinners are active; the
    // per-file lines provide all the feedback that matters to the user.
    let filter = if verbose {
        "debug"
    } else if show_progress {
        "error"
    } else {
        "info"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn run_config<W: Write>(args: ConfigArgs, out: &mut W) -> Result<ExitCode> {
    let path = FileCredentialStore::default_path().context("Failed to locate settings")?;

    if let Some(ref key) = args.key {
        // A corrupt file must not block the command that repairs it.
        let store = FileCredentialStore::open_or_reset(&path).context("Failed to load settings")?;
        store.set(key).context("Failed to save API key")?;
        writeln!(out, "{}", green("API Key saved successfully!"))?;
    } else if args.delete {
        let store = FileCredentialStore::open_or_reset(&path).context("Failed to load settings")?;
        store.delete().context("Failed to delete API key")?;
        writeln!(out, "{}", yellow("API Key removed."))?;
    } else if args.show {
        let store = FileCredentialStore::open(&path).context("Failed to load settings")?;
        match store.get() {
            Some(key) => writeln!(out, "Current API Key: {}", cyan(&mask_secret(&key)))?,
            None => writeln!(out, "{}", red("No API Key set."))?,
        }
    } else {
        writeln!(out, "Use --key, --delete, or --show.")?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Fetch the PDF engine up front, with a download bar, when no copy is
/// available locally. Failures are left for the per-file extraction errors.
async fn prepare_pdfium<W: Write>(show_progress: bool, out: &mut W) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() || pdfium_auto::local_pdfium_available() {
        return Ok(());
    }

    let bar = if show_progress {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_prefix("PDF engine");
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let task_bar = bar.clone();
    let fetched = tokio::task::spawn_blocking(move || match task_bar {
        Some(bar) => pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length() != Some(t) {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        })),
        None => pdfium_auto::ensure_pdfium_library(None),
    })
    .await
    .context("PDF engine download task failed")?;

    match fetched {
        Ok(_) => {
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
        }
        Err(e) => {
            if let Some(bar) = bar {
                bar.abandon();
            }
            writeln!(out, "{}", yellow(&format!("Warning: {e}")))?;
        }
    }
    Ok(())
}

async fn run_convert<W: Write>(args: ConvertArgs, out: &mut W) -> Result<ExitCode> {
    let show_progress = !args.no_progress;

    // ── Validate input ───────────────────────────────────────────────────
    let kind = match classify_input(&args.input) {
        Ok(kind) => kind,
        Err(e) => {
            writeln!(out, "{}", red(&format!("Error: {e}")))?;
            return Ok(ExitCode::FAILURE);
        }
    };

    if kind == InputKind::Directory && args.output.is_some() {
        writeln!(
            out,
            "{}",
            yellow("Warning: --output is ignored when processing a directory.")
        )?;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let mode: ConversionMode = args.mode.into();
    let mut builder = ConversionConfig::builder()
        .mode(mode)
        .model(&args.model)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref out_path) = args.output {
        builder = builder.output(out_path);
    }
    if mode == ConversionMode::Ai {
        match FileCredentialStore::open_default() {
            Ok(store) => builder = builder.credentials(Arc::new(store)),
            Err(e) => writeln!(out, "{}", yellow(&format!("Warning: {e}")))?,
        }
    }

    let progress: ProgressCallback = CliProgressCallback::new(&args.input, show_progress);
    let config = builder
        .progress_callback(progress)
        .build()
        .context("Invalid configuration")?;

    writeln!(
        out,
        "{} {}  {}",
        cyan("◆"),
        bold("pdf2md"),
        dim(&format!("mode: {mode}  input: {}", args.input.display()))
    )?;

    prepare_pdfium(show_progress, out).await?;

    // ── Run conversion ───────────────────────────────────────────────────
    let report = match convert(&args.input, &config).await {
        Ok(report) => report,
        Err(e) => {
            writeln!(out, "{}", red(&format!("Error: {e}")))?;
            return Ok(ExitCode::FAILURE);
        }
    };

    if report.kind == InputKind::Directory && report.total() == 0 {
        writeln!(out, "{}", yellow("No PDF files found in directory."))?;
    }

    Ok(ExitCode::SUCCESS)
}
