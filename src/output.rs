//! Result types produced by a conversion invocation.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The result of converting one PDF. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// The PDF that was processed.
    pub source: PathBuf,
    /// Where the Markdown was written. `None` when the file failed.
    pub output: Option<PathBuf>,
    /// Why the file failed. `None` on success.
    pub error: Option<FileError>,
}

impl ConversionOutcome {
    pub fn success(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failure(error: FileError) -> Self {
        Self {
            source: error.file().clone(),
            output: None,
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Human-readable failure reason, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Whether the invocation targeted one file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    File,
    Directory,
}

/// Everything one invocation produced, in processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub kind: InputKind,
    /// One outcome per attempted file, in enumeration order.
    pub outcomes: Vec<ConversionOutcome>,
    /// Non-fatal notices (e.g. an ignored output option).
    pub warnings: Vec<String>,
}

impl ConversionReport {
    pub fn new(input: impl Into<PathBuf>, kind: InputKind) -> Self {
        Self {
            input: input.into(),
            kind,
            outcomes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Files attempted.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let mut report = ConversionReport::new("docs", InputKind::Directory);
        report
            .outcomes
            .push(ConversionOutcome::success("docs/a.pdf", "docs/a.md"));
        report.outcomes.push(ConversionOutcome::failure(
            FileError::ExtractionFailed {
                file: "docs/b.pdf".into(),
                message: "bad xref".into(),
            },
        ));
        report
            .outcomes
            .push(ConversionOutcome::success("docs/c.pdf", "docs/c.md"));

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        let failed: Vec<_> = report.failures().map(|o| o.source().to_path_buf()).collect();
        assert_eq!(failed, vec![PathBuf::from("docs/b.pdf")]);
    }

    #[test]
    fn failure_outcome_takes_source_from_error() {
        let o = ConversionOutcome::failure(FileError::MissingCredential {
            file: "x.pdf".into(),
        });
        assert_eq!(o.source(), Path::new("x.pdf"));
        assert!(o.output.is_none());
        assert!(o.error_message().unwrap().contains("API Key"));
    }

    #[test]
    fn outcome_serialises() {
        let o = ConversionOutcome::success("a.pdf", "a.md");
        let json = serde_json::to_string(&o).unwrap();
        assert!(json.contains("\"output\":\"a.md\""), "got: {json}");
    }
}
