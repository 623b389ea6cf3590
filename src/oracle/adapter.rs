//! Invokes a shared oracle with a concurrency limit and a deadline.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::OracleLimits;
use crate::error::OracleError;
use crate::oracle::{RegionMask, SegmentationOracle};

/// Handle to a segmentation oracle shared by every pipeline run.
///
/// Cloning is cheap; clones share the oracle and its inference slots.
#[derive(Clone)]
pub struct OracleAdapter {
    oracle: Arc<dyn SegmentationOracle>,
    slots: Arc<Semaphore>,
    timeout: Duration,
    queue_timeout: Duration,
}

impl OracleAdapter {
    pub fn new(oracle: Arc<dyn SegmentationOracle>, limits: &OracleLimits) -> Self {
        Self {
            oracle,
            slots: Arc::new(Semaphore::new(limits.max_concurrent.max(1))),
            timeout: limits.timeout(),
            queue_timeout: limits.queue_timeout(),
        }
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Free inference slots right now.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Run the oracle on `pixels` and check every mask matches the crop.
    ///
    /// Waiting for a free slot is bounded by the queue deadline; the
    /// inference deadline starts once the slot is held. The slot stays held
    /// until the blocking call returns, even when the deadline has already
    /// fired, so a stalled backend is never entered twice.
    pub async fn segment(&self, pixels: &RgbImage) -> Result<Vec<RegionMask>, OracleError> {
        let expected = (pixels.height() as usize, pixels.width() as usize);
        if expected.0 == 0 || expected.1 == 0 {
            return Err(OracleError::InvalidInput(format!(
                "crop has no pixels ({}x{})",
                expected.1, expected.0
            )));
        }

        let slot = Arc::clone(&self.slots).acquire_owned();
        let permit = tokio::time::timeout(self.queue_timeout, slot)
            .await
            .map_err(|_| {
                OracleError::ResourceExhausted(format!(
                    "no free oracle slot within {:?}",
                    self.queue_timeout
                ))
            })?
            .map_err(|_| OracleError::ResourceExhausted("oracle slots closed".to_string()))?;

        let oracle = Arc::clone(&self.oracle);
        let pixels = pixels.clone();
        let inference = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            oracle.predict(&pixels)
        });

        let masks = tokio::time::timeout(self.timeout, inference)
            .await
            .map_err(|_| OracleError::Timeout(self.timeout))?
            .map_err(|e| OracleError::Panicked(e.to_string()))??;

        debug!(
            oracle = self.oracle.name(),
            masks = masks.len(),
            "oracle returned"
        );
        check_shapes(masks, expected)
    }
}

fn check_shapes(
    masks: Vec<RegionMask>,
    expected: (usize, usize),
) -> Result<Vec<RegionMask>, OracleError> {
    if let Some(bad) = masks.iter().find(|m| m.dims() != expected) {
        return Err(OracleError::ShapeMismatch {
            expected,
            got: bad.dims(),
        });
    }
    Ok(masks)
}
