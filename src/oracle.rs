//! Segmentation oracle boundary.
//!
//! This module provides the trait any segmentation capability implements,
//! the adapter that invokes it with a concurrency limit and a deadline, and
//! the bundled backends (a classical luma threshold and, behind the
//! `burn-backend` feature, learned Burn models).

mod adapter;
mod source;
mod threshold;

pub use adapter::OracleAdapter;
pub use source::{IntoRegionMasks, RegionMask, SegmentationOracle};
pub use threshold::LumaThresholdOracle;

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnMaskModel, BurnSegmenter};
