//! Results of image runs and batches.

use image::RgbImage;

use crate::compositor::CompositedOutput;
use crate::error::MaskError;
use crate::geometry::{MappedRegion, PixelRect};
use crate::pipeline::{RegionState, RunState};
use crate::store::{ImageId, OutputName, OutputSink};

/// What happened to one box.
#[derive(Debug)]
pub struct RegionOutcome {
    /// Position of the box in annotation order
    pub index: usize,
    /// The box in image space
    pub mapped: MappedRegion,
    /// Crop window handed to the oracle, if extraction succeeded
    pub padded: Option<PixelRect>,
    pub state: RegionState,
}

/// Padded crop of one region, resized to a square.
#[derive(Debug, Clone)]
pub struct AuxCrop {
    pub index: usize,
    pub image: RgbImage,
}

/// Everything a successful run produced.
#[derive(Debug)]
pub struct ImageOutput {
    pub composite: CompositedOutput,
    /// One entry per box, in annotation order
    pub regions: Vec<RegionOutcome>,
    pub aux_crops: Vec<AuxCrop>,
    /// Per-region composites, when enabled
    pub region_composites: Vec<(usize, RgbImage)>,
}

impl ImageOutput {
    pub fn composited_regions(&self) -> usize {
        self.regions.iter().filter(|r| r.state.is_composited()).count()
    }

    /// Regions that were dropped, with the reason.
    pub fn skipped_regions(&self) -> impl Iterator<Item = (usize, &MaskError)> {
        self.regions.iter().filter_map(|r| match &r.state {
            RegionState::Skipped(err) => Some((r.index, err)),
            RegionState::Composited { .. } => None,
        })
    }

    /// Hand every artifact to `sink` under its deterministic name.
    pub fn write_to(&self, id: &ImageId, sink: &dyn OutputSink) -> Result<usize, MaskError> {
        sink.write(&OutputName::Composite(id), &self.composite.image)?;
        let mut written = 1;
        for (index, image) in &self.region_composites {
            sink.write(&OutputName::RegionComposite { index: *index, id }, image)?;
            written += 1;
        }
        for crop in &self.aux_crops {
            sink.write(
                &OutputName::AuxCrop {
                    index: crop.index,
                    id,
                },
                &crop.image,
            )?;
            written += 1;
        }
        Ok(written)
    }
}

#[derive(Debug)]
pub enum ImageStatus {
    Succeeded(ImageOutput),
    /// The run aborted with an image-level error. `regions` holds the
    /// outcomes of every box reached before the abort.
    Failed {
        error: MaskError,
        regions: Vec<RegionOutcome>,
    },
    /// Cancelled before the run started
    Cancelled,
}

/// Result of one image's run.
#[derive(Debug)]
pub struct ImageReport {
    pub id: ImageId,
    pub status: ImageStatus,
    /// Last stage the run entered
    pub reached: RunState,
}

impl ImageReport {
    pub fn cancelled(id: ImageId) -> Self {
        Self {
            id,
            status: ImageStatus::Cancelled,
            reached: RunState::Idle,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ImageStatus::Succeeded(_))
    }

    pub fn output(&self) -> Option<&ImageOutput> {
        match &self.status {
            ImageStatus::Succeeded(output) => Some(output),
            _ => None,
        }
    }

    /// Region outcomes, whether the run succeeded or failed.
    pub fn regions(&self) -> &[RegionOutcome] {
        match &self.status {
            ImageStatus::Succeeded(output) => &output.regions,
            ImageStatus::Failed { regions, .. } => regions,
            ImageStatus::Cancelled => &[],
        }
    }

    pub fn error(&self) -> Option<&MaskError> {
        match &self.status {
            ImageStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Reports for a batch, in request order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub images: Vec<ImageReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ImageReport> {
        self.images.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ImageReport> {
        self.images
            .iter()
            .filter(|r| matches!(r.status, ImageStatus::Failed { .. }))
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &ImageReport> {
        self.images
            .iter()
            .filter(|r| matches!(r.status, ImageStatus::Cancelled))
    }

    pub fn get(&self, id: &ImageId) -> Option<&ImageReport> {
        self.images.iter().find(|r| &r.id == id)
    }

    /// Write all successful outputs; stops at the first sink error.
    pub fn write_outputs(&self, sink: &dyn OutputSink) -> Result<usize, MaskError> {
        let mut written = 0;
        for report in &self.images {
            if let Some(output) = report.output() {
                written += output.write_to(&report.id, sink)?;
            }
        }
        Ok(written)
    }
}
