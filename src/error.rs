//! Error types for the box-to-mask pipeline.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by (or on behalf of) a segmentation oracle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// The backing model has not been loaded.
    #[error("segmentation model not loaded")]
    NotLoaded,
    /// The oracle rejected the crop it was given.
    #[error("invalid oracle input: {0}")]
    InvalidInput(String),
    /// Device memory, threads or similar ran out.
    #[error("oracle resources exhausted: {0}")]
    ResourceExhausted(String),
    /// A returned mask does not match the crop it was computed for.
    #[error("mask shape mismatch: expected {expected:?} (h, w), got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// The invocation did not finish within its deadline.
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
    /// The oracle panicked while running.
    #[error("oracle panicked: {0}")]
    Panicked(String),
    /// Any other backend specific failure.
    #[error("oracle backend error: {0}")]
    Backend(String),
}

/// Errors produced by the pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum MaskError {
    #[error("invalid display transform: {0}")]
    InvalidTransform(String),

    #[error("region {index} is empty: {reason}")]
    EmptyRegion { index: usize, reason: String },

    #[error("segmentation failed for region {index}: {source}")]
    OracleFailure {
        index: usize,
        #[source]
        source: OracleError,
    },

    #[error("malformed annotations: {0}")]
    MalformedAnnotations(String),

    #[error("image {id} unreadable: {reason}")]
    ImageUnreadable { id: String, reason: String },

    #[error("image run aborted: {0}")]
    Aborted(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MaskError {
    /// Region-level errors skip one box; everything else aborts the image.
    pub fn is_region_level(&self) -> bool {
        matches!(
            self,
            MaskError::EmptyRegion { .. } | MaskError::OracleFailure { .. }
        )
    }

    pub(crate) fn empty_region(index: usize, reason: impl Into<String>) -> Self {
        MaskError::EmptyRegion {
            index,
            reason: reason.into(),
        }
    }
}
