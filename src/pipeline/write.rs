//! Output stage: derive the Markdown path and write it to disk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default output location for `input`.
///
/// A trailing `.pdf` (any ASCII case) becomes `.md`: `docs/Report.PDF` →
/// `docs/Report.md`. Other names get their extension replaced by `.md`, or
/// `.md` appended when that would collide with the input itself.
pub fn default_output_path(input: &Path) -> PathBuf {
    let Some(name) = input.file_name() else {
        return input.with_extension("md");
    };

    let name_str = name.to_string_lossy();
    if super::discover::is_pdf_name(&name_str) {
        let stem = &name_str[..name_str.len() - 4];
        return input.with_file_name(format!("{stem}.md"));
    }

    let replaced = input.with_extension("md");
    if replaced == input {
        let mut appended = OsString::from(name);
        appended.push(".md");
        return input.with_file_name(appended);
    }
    replaced
}

/// Write `content` to `path`, creating parent directories and replacing any
/// existing file.
///
/// The content goes to a sibling temp file first and is then renamed into
/// place, so a failed write never leaves a truncated Markdown file behind.
pub async fn write_markdown(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut tmp_name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let written = match tokio::fs::write(&tmp_path, content).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pdf_extension_replaced() {
        assert_eq!(
            default_output_path(Path::new("docs/report.pdf")),
            PathBuf::from("docs/report.md")
        );
        assert_eq!(
            default_output_path(Path::new("Scan.PDF")),
            PathBuf::from("Scan.md")
        );
    }

    #[test]
    fn only_trailing_pdf_is_replaced() {
        assert_eq!(
            default_output_path(Path::new("a.pdf.d/notes.pdf")),
            PathBuf::from("a.pdf.d/notes.md")
        );
        assert_eq!(
            default_output_path(Path::new("archive.pdf.txt")),
            PathBuf::from("archive.pdf.md")
        );
    }

    #[test]
    fn hidden_pdf_name() {
        assert_eq!(default_output_path(Path::new("dir/.pdf")), PathBuf::from("dir/.md"));
    }

    #[test]
    fn non_pdf_inputs_never_map_to_themselves() {
        assert_eq!(default_output_path(Path::new("README")), PathBuf::from("README.md"));
        assert_eq!(default_output_path(Path::new("notes.md")), PathBuf::from("notes.md.md"));
    }

    #[tokio::test]
    async fn write_creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("a/b/c/out.md");

        write_markdown(&out, "first").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "first");

        write_markdown(&out, "second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "second");

        let leftovers: Vec<_> = std::fs::read_dir(out.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![OsString::from("out.md")]);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_temp_write_removes_temp_file() {
        if !Path::new("/dev/full").exists() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.md");
        // Writes through this link fail with ENOSPC.
        let tmp = dir.path().join("out.md.tmp");
        std::os::unix::fs::symlink("/dev/full", &tmp).unwrap();

        assert!(write_markdown(&out, "text").await.is_err());
        assert!(!out.exists());
        assert!(std::fs::symlink_metadata(&tmp).is_err());
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // The destination is an existing non-empty directory, so rename fails
        // after the temp file was written.
        let out = dir.path().join("taken.md");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("keep"), "x").unwrap();

        assert!(write_markdown(&out, "text").await.is_err());
        assert!(!dir.path().join("taken.md.tmp").exists());
    }

    #[tokio::test]
    async fn write_fails_when_parent_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        assert!(write_markdown(&blocker.join("out.md"), "text").await.is_err());
    }
}
