//! Pipeline runs: one image's boxes end to end, and batches of images.

mod batch;
mod builder;
mod cancel;
mod report;
mod run;
mod state;

pub use builder::PipelineBuilder;
pub use cancel::CancelToken;
pub use report::{AuxCrop, BatchReport, ImageOutput, ImageReport, ImageStatus, RegionOutcome};
pub use run::MaskPipeline;
pub use state::{RegionState, RunState};
