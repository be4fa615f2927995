//! Batch image analysis service.
//!
//! Runs one engine over an ordered list of images with a bounded pool of
//! concurrent workers. Each image owns an output slot indexed by its input
//! position, so completion order never reorders the report. Failures stay
//! per-image: nothing here aborts the batch.

mod types;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinError;

use crate::ocr::{OcrEngine, OcrResult};

pub use types::{BatchCounts, BatchEvent, BatchReport};

/// Default number of concurrent analyses.
pub const DEFAULT_WORKERS: usize = 4;

/// Service that analyzes a batch of images with one engine.
pub struct BatchRunner {
    engine: Arc<dyn OcrEngine>,
    workers: usize,
}

impl BatchRunner {
    /// Create a new runner with [`DEFAULT_WORKERS`] workers.
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Set the number of concurrent analyses (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Analyze every image without progress events.
    pub async fn run(&self, images: &[PathBuf]) -> BatchReport {
        let (event_tx, event_rx) = mpsc::channel(1);
        drop(event_rx);
        self.process(images, event_tx).await
    }

    /// Analyze every image, emitting progress events on `event_tx`.
    ///
    /// Event delivery is best-effort; a closed receiver does not affect the run.
    pub async fn process(
        &self,
        images: &[PathBuf],
        event_tx: mpsc::Sender<BatchEvent>,
    ) -> BatchReport {
        self.process_until(images, event_tx, std::future::pending())
            .await
    }

    /// Like [`BatchRunner::process`], but stops early once `shutdown` resolves.
    ///
    /// On shutdown, outstanding analyses are aborted and the report keeps
    /// every result that had already completed.
    pub async fn process_until<F>(
        &self,
        images: &[PathBuf],
        event_tx: mpsc::Sender<BatchEvent>,
        shutdown: F,
    ) -> BatchReport
    where
        F: Future<Output = ()>,
    {
        let total = images.len();
        let _ = event_tx
            .send(BatchEvent::Started {
                total_images: total,
            })
            .await;

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut pending = FuturesUnordered::new();
        let mut abort_handles = Vec::with_capacity(total);

        for (index, path) in images.iter().cloned().enumerate() {
            let engine = self.engine.clone();
            let semaphore = semaphore.clone();
            let event_tx = event_tx.clone();

            let handle = tokio::spawn(async move {
                // Never closed, so acquire cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();

                let _ = event_tx
                    .send(BatchEvent::ImageStarted {
                        index,
                        path: path.clone(),
                    })
                    .await;

                let result = engine.analyze(&path).await;

                let _ = event_tx
                    .send(BatchEvent::ImageCompleted {
                        index,
                        path,
                        success: result.success,
                        error: result.error.clone(),
                    })
                    .await;

                result
            });

            abort_handles.push(handle.abort_handle());
            pending.push(async move { (index, handle.await) });
        }

        let mut slots: Vec<Option<OcrResult>> = vec![None; total];
        let mut interrupted = false;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                next = pending.next() => match next {
                    Some((index, joined)) => {
                        slots[index] = Some(self.settle(images, index, joined, &event_tx).await);
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    interrupted = true;
                    break;
                }
            }
        }

        let report = if interrupted {
            for handle in &abort_handles {
                handle.abort();
            }
            // Tasks that finished before the abort still hand back their result.
            while let Some((index, joined)) = pending.next().await {
                match joined {
                    Err(e) if e.is_cancelled() => {}
                    joined => {
                        slots[index] = Some(self.settle(images, index, joined, &event_tx).await);
                    }
                }
            }
            let report = BatchReport::interrupted(slots.into_iter().flatten().collect());
            tracing::warn!(
                "Batch interrupted after {}/{} images",
                report.counts.total,
                total
            );
            report
        } else {
            let results: Vec<OcrResult> = slots
                .into_iter()
                .enumerate()
                .map(|(index, slot)| {
                    slot.unwrap_or_else(|| {
                        OcrResult::failure(
                            images[index].display().to_string(),
                            self.engine.kind(),
                            "analysis produced no result",
                        )
                    })
                })
                .collect();

            let report = BatchReport::from_results(results);
            tracing::info!(
                "Batch complete: {}/{} successful",
                report.counts.succeeded,
                report.counts.total
            );
            report
        };

        let _ = event_tx
            .send(BatchEvent::Complete {
                succeeded: report.counts.succeeded,
                failed: report.counts.failed,
            })
            .await;

        report
    }

    /// Turn a joined task into a result; a panicked task becomes a failure.
    async fn settle(
        &self,
        images: &[PathBuf],
        index: usize,
        joined: Result<OcrResult, JoinError>,
        event_tx: &mpsc::Sender<BatchEvent>,
    ) -> OcrResult {
        match joined {
            Ok(result) => result,
            Err(e) => {
                let path = &images[index];
                tracing::error!("Analysis task for {} failed: {}", path.display(), e);
                let result = OcrResult::failure(
                    path.display().to_string(),
                    self.engine.kind(),
                    format!("analysis task failed: {}", e),
                );
                let _ = event_tx
                    .send(BatchEvent::ImageCompleted {
                        index,
                        path: path.clone(),
                        success: false,
                        error: result.error.clone(),
                    })
                    .await;
                result
            }
        }
    }
}
