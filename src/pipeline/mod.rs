//! Pipeline stages for PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the two external collaborators (PDF text extraction and the
//! generative model) sit behind traits that tests can replace.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ extract ──▶ format ──▶ write
//! (walkdir)   (pdfium)    (Gemini)   (.md file)
//!                          ai only
//! ```
//!
//! 1. [`discover`]: find `.pdf` files under a directory, deterministic order
//! 2. [`extract`]:  pull plain text out of PDF bytes; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`format`]:   reformat text as Markdown through the model; the only
//!    stage with network I/O
//! 4. [`write`]:    derive the `.md` path and write it atomically

pub mod discover;
pub mod extract;
pub mod format;
pub mod write;
