//! Batch service types and events.

use std::path::PathBuf;

use serde::Serialize;

use crate::ocr::OcrResult;

/// Events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Batch started
    Started { total_images: usize },
    /// Image analysis started (a worker picked it up)
    ImageStarted { index: usize, path: PathBuf },
    /// Image analysis finished, successfully or not
    ImageCompleted {
        index: usize,
        path: PathBuf,
        success: bool,
        error: Option<String>,
    },
    /// All images finished
    Complete { succeeded: usize, failed: usize },
}

/// Aggregate counts for a batch. `succeeded + failed == total` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Output of one batch run: one result per input image, in input order.
///
/// An interrupted run holds only the images that finished before the stop,
/// still in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<OcrResult>,
    pub counts: BatchCounts,
    pub interrupted: bool,
}

impl BatchReport {
    /// Build a report, deriving counts from each result's `success` flag.
    pub fn from_results(results: Vec<OcrResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let counts = BatchCounts {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        };
        Self {
            results,
            counts,
            interrupted: false,
        }
    }

    /// Report for a run stopped before every image finished.
    pub fn interrupted(completed: Vec<OcrResult>) -> Self {
        Self {
            interrupted: true,
            ..Self::from_results(completed)
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.counts.failed == 0
    }

    /// Results that failed, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &OcrResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{Annotations, EngineKind};

    #[test]
    fn test_counts_fold_over_success() {
        let report = BatchReport::from_results(vec![
            OcrResult::from_annotations("a.png", EngineKind::LocalOcr, Annotations::default()),
            OcrResult::failure("b.png", EngineKind::LocalOcr, "boom"),
            OcrResult::from_annotations("c.png", EngineKind::LocalOcr, Annotations::default()),
        ]);

        assert_eq!(
            report.counts,
            BatchCounts {
                total: 3,
                succeeded: 2,
                failed: 1
            }
        );
        assert!(!report.all_succeeded());
        let failed: Vec<_> = report.failures().map(|r| r.image_path.as_str()).collect();
        assert_eq!(failed, vec!["b.png"]);
    }

    #[test]
    fn test_empty_report() {
        let report = BatchReport::from_results(Vec::new());
        assert_eq!(report.counts, BatchCounts::default());
        assert!(report.all_succeeded());
        assert!(!report.interrupted);
    }

    #[test]
    fn test_interrupted_report_counts_completed_only() {
        let report = BatchReport::interrupted(vec![OcrResult::failure(
            "a.png",
            EngineKind::LocalOcr,
            "boom",
        )]);
        assert!(report.interrupted);
        assert_eq!(
            report.counts,
            BatchCounts {
                total: 1,
                succeeded: 0,
                failed: 1
            }
        );
    }
}
