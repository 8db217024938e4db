//! End-to-end tests for pdf2md-cli.
//!
//! These use real PDF files in `./test_cases/`, a real PDFium library and,
//! for AI mode, live Gemini calls. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture
//!
//! AI-mode tests additionally need `GEMINI_API_KEY`.

use pdf2md_cli::{
    convert, ConversionConfig, ConversionMode, PdfiumExtractor, TextExtractor,
};
use std::path::PathBuf;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn gemini_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// Copy a fixture into a scratch dir so outputs don't land in the repo.
fn stage(src: &PathBuf) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let dst = dir.path().join(src.file_name().unwrap());
    std::fs::copy(src, &dst).unwrap();
    (dir, dst)
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_pdfium_extracts_text() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let bytes = std::fs::read(&pdf).unwrap();
    let text = PdfiumExtractor::new().extract(bytes).await.unwrap();

    println!("extracted {} chars", text.len());
    assert!(!text.trim().is_empty(), "expected some text from sample.pdf");
}

#[tokio::test]
async fn e2e_pdfium_rejects_garbage() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let result = PdfiumExtractor::new()
        .extract(b"definitely not a pdf".to_vec())
        .await;
    assert!(result.is_err());
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_standalone_file() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let (dir, staged) = stage(&pdf);

    let config = ConversionConfig::builder().build().unwrap();
    let report = convert(&staged, &config).await.unwrap();

    assert_eq!(report.succeeded(), 1, "{:?}", report.outcomes);
    let md = std::fs::read_to_string(dir.path().join("sample.md")).unwrap();
    assert!(!md.trim().is_empty());
}

#[tokio::test]
async fn e2e_ai_file() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let Some(key) = gemini_key() else {
        println!("SKIP: GEMINI_API_KEY not set");
        return;
    };
    let (dir, staged) = stage(&pdf);

    let mut builder = ConversionConfig::builder()
        .mode(ConversionMode::Ai)
        .api_key(key);
    if let Ok(model) = std::env::var("PDF2MD_MODEL") {
        builder = builder.model(model);
    }
    let report = convert(&staged, &builder.build().unwrap()).await.unwrap();

    assert_eq!(report.succeeded(), 1, "{:?}", report.outcomes);
    let md = std::fs::read_to_string(dir.path().join("sample.md")).unwrap();
    println!("{}", md.chars().take(500).collect::<String>());
    assert!(!md.trim().is_empty());
}

#[tokio::test]
async fn e2e_ai_invalid_key_is_reported_per_file() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let (dir, staged) = stage(&pdf);

    let config = ConversionConfig::builder()
        .mode(ConversionMode::Ai)
        .api_key("invalid-key-for-e2e")
        .build()
        .unwrap();
    let report = convert(&staged, &config).await.unwrap();

    assert_eq!(report.failed(), 1);
    let msg = report.outcomes[0].error_message().unwrap();
    println!("{msg}");
    assert!(msg.starts_with("AI processing failed:"));
    assert!(!dir.path().join("sample.md").exists());
}
