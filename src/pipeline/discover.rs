//! Directory discovery: find every PDF below a directory.
//!
//! Symbolic links are neither followed nor selected, so a link cycle can't
//! trap the walk and no file outside the tree is converted. Hidden files are
//! included. Entries are sorted by file name at every level, which gives a
//! stable processing order across platforms.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// `true` when `name` ends with `.pdf`, ignoring ASCII case.
pub fn is_pdf_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 4 && bytes[bytes.len() - 4..].eq_ignore_ascii_case(b".pdf")
}

/// Recursively collect regular files under `dir` whose name ends in `.pdf`.
///
/// Unreadable entries are logged and skipped; they never abort discovery.
pub fn discover_pdfs(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if is_pdf_name(&entry.file_name().to_string_lossy()) {
            found.push(entry.into_path());
        }
    }

    debug!("Discovered {} PDF files under {}", found.len(), dir.display());
    found
}
