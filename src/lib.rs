//! Box-prompted segmentation overlays.
//!
//! Boxes drawn on a (possibly rescaled) annotation surface are mapped into
//! source-image pixels, cropped with padding, segmented by an external
//! oracle, and the resulting masks are composited into one full-resolution
//! overlay blended onto the original image.
//!
//! ```ignore
//! use std::sync::Arc;
//! use boxmask_rs::{AnnotationSet, BoundingBox, ImageId, LumaThresholdOracle, MaskPipeline};
//!
//! let pipeline = MaskPipeline::with_default_config(Arc::new(LumaThresholdOracle::new()));
//! let boxes = AnnotationSet::new(vec![BoundingBox::new(10.0, 10.0, 20.0, 20.0)]);
//! let output = pipeline.process_image(&ImageId::from("cat.png"), &image, &boxes).await?;
//! output.composite.image.save("masked_cat.png")?;
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod oracle;
pub mod pipeline;
pub mod store;

pub use compositor::{CompositedOutput, Compositor, OverlayBuffer, PlacedMasks};
pub use config::{OracleLimits, OverlayStyle, PipelineConfig, Placement};
pub use error::{MaskError, OracleError};
pub use extract::{RegionCrop, extract};
pub use geometry::{
    BoundingBox, DisplaySurface, DisplayTransform, MappedRegion, PaddedRegion, PixelRect, Region,
};
pub use oracle::{LumaThresholdOracle, OracleAdapter, RegionMask, SegmentationOracle};

#[cfg(feature = "burn-backend")]
pub use oracle::{BurnMaskModel, BurnSegmenter};
pub use pipeline::{
    BatchReport, CancelToken, ImageOutput, ImageReport, ImageStatus, MaskPipeline,
    PipelineBuilder, RegionOutcome, RegionState, RunState,
};
pub use store::{
    AnnotationSet, AnnotationStore, DirImageSource, DirOutputSink, ImageId, ImageSource,
    JsonAnnotationStore, MemoryImageSource, MemoryOutputSink, OutputName, OutputSink,
};
