//! Batches: independent images run concurrently against one oracle.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::MaskError;
use crate::pipeline::{BatchReport, CancelToken, ImageReport, ImageStatus, MaskPipeline, RunState};
use crate::store::{AnnotationStore, ImageId, ImageSource};

impl MaskPipeline {
    /// Run every image in `ids`, at most `max_parallel_images` at a time.
    ///
    /// Reports come back in request order. No image's failure (or panic)
    /// escapes; images not started before `cancel` fires report `Cancelled`.
    pub async fn run_batch(
        &self,
        ids: Vec<ImageId>,
        images: Arc<dyn ImageSource>,
        store: Arc<dyn AnnotationStore>,
        cancel: &CancelToken,
    ) -> BatchReport {
        info!(images = ids.len(), "starting batch");
        let limit = Arc::new(Semaphore::new(self.config().max_parallel_images));
        let mut tasks = JoinSet::new();

        for (slot, id) in ids.iter().cloned().enumerate() {
            let pipeline = self.clone();
            let images = Arc::clone(&images);
            let store = Arc::clone(&store);
            let cancel = cancel.clone();
            let limit = Arc::clone(&limit);

            tasks.spawn(async move {
                let _permit = limit.acquire_owned().await.ok();
                let report = if cancel.is_cancelled() {
                    ImageReport::cancelled(id)
                } else {
                    pipeline.run(&id, images.as_ref(), store.as_ref()).await
                };
                (slot, report)
            });
        }

        let mut slots: Vec<Option<ImageReport>> = ids.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, report)) => slots[slot] = Some(report),
                Err(err) => error!(error = %err, "image task aborted"),
            }
        }

        let images = slots
            .into_iter()
            .zip(ids)
            .map(|(report, id)| {
                report.unwrap_or_else(|| ImageReport {
                    id,
                    status: ImageStatus::Failed {
                        error: MaskError::Aborted("processing task panicked".to_string()),
                        regions: Vec::new(),
                    },
                    reached: RunState::Idle,
                })
            })
            .collect();

        let report = BatchReport { images };
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            cancelled = report.cancelled().count(),
            "batch done"
        );
        report
    }

    /// Run every image the store has annotations for.
    pub async fn run_store(
        &self,
        images: Arc<dyn ImageSource>,
        store: Arc<dyn AnnotationStore>,
        cancel: &CancelToken,
    ) -> BatchReport {
        let ids = store.image_ids();
        self.run_batch(ids, images, store, cancel).await
    }
}
