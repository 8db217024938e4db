//! Progress-callback trait for per-file conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks through the files of an invocation. The CLI
//! uses it to drive a per-file spinner; library users can forward the events
//! anywhere.
//!
//! Files are processed sequentially, so events for one file never interleave
//! with events for another.

use crate::output::ConversionOutcome;
use std::path::Path;
use std::sync::Arc;

/// Stage a file has reached inside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    /// Reading the PDF and extracting its text.
    Extracting,
    /// Waiting on the generative model.
    Formatting,
    /// Writing the Markdown file.
    Writing,
}

/// Called by the conversion pipeline as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once in directory mode after discovery, before any file is
    /// processed. `total_files` may be zero.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is processed.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the batch
    /// * `total`: files in the batch (1 in single-file mode)
    fn on_file_start(&self, path: &Path, index: usize, total: usize) {
        let _ = (path, index, total);
    }

    /// Called when a file moves to a new stage.
    fn on_file_stage(&self, path: &Path, stage: FileStage) {
        let _ = (path, stage);
    }

    /// Called once per file with its final outcome, success or failure.
    fn on_file_complete(&self, outcome: &ConversionOutcome) {
        let _ = outcome;
    }

    /// Called once in directory mode after every discovered file was attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        successes: AtomicUsize,
        failures: AtomicUsize,
        stages: Mutex<Vec<FileStage>>,
        batch_total: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_files: usize) {
            self.batch_total.store(total_files, Ordering::SeqCst);
        }

        fn on_file_start(&self, _path: &Path, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_stage(&self, _path: &Path, stage: FileStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_file_complete(&self, outcome: &ConversionOutcome) {
            if outcome.succeeded() {
                self.successes.fetch_add(1, Ordering::SeqCst);
            } else {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(Path::new("a.pdf"), 1, 2);
        cb.on_file_stage(Path::new("a.pdf"), FileStage::Extracting);
        cb.on_file_complete(&ConversionOutcome::success("a.pdf", "a.md"));
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(2);
        tracker.on_file_start(Path::new("a.pdf"), 1, 2);
        tracker.on_file_stage(Path::new("a.pdf"), FileStage::Extracting);
        tracker.on_file_stage(Path::new("a.pdf"), FileStage::Writing);
        tracker.on_file_complete(&ConversionOutcome::success("a.pdf", "a.md"));
        tracker.on_file_start(Path::new("b.pdf"), 2, 2);
        tracker.on_file_complete(&ConversionOutcome::failure(FileError::ExtractionFailed {
            file: "b.pdf".into(),
            message: "truncated".into(),
        }));

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.successes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![FileStage::Extracting, FileStage::Writing]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_file_start(Path::new("x.pdf"), 1, 1);
    }
}
