//! Builder for creating a MaskPipeline from an oracle and config overrides.

use std::sync::Arc;

use crate::config::{OracleLimits, OverlayStyle, PipelineConfig, Placement};
use crate::error::MaskError;
use crate::geometry::DisplaySurface;
use crate::oracle::SegmentationOracle;
use crate::pipeline::MaskPipeline;

/// Builder for [`MaskPipeline`]. Starts from [`PipelineConfig::default`].
pub struct PipelineBuilder {
    oracle: Arc<dyn SegmentationOracle>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new builder around `oracle`.
    pub fn new(oracle: Arc<dyn SegmentationOracle>) -> Self {
        Self {
            oracle,
            config: PipelineConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the padding fraction applied around each box.
    pub fn padding(mut self, padding: f64) -> Self {
        self.config.padding = padding;
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.config.placement = placement;
        self
    }

    /// Set the surface boxes were drawn on.
    pub fn display(mut self, display: DisplaySurface) -> Self {
        self.config.display = display;
        self
    }

    pub fn overlay(mut self, overlay: OverlayStyle) -> Self {
        self.config.overlay = overlay;
        self
    }

    /// Set the overlay blend strength only.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.config.overlay.alpha = alpha;
        self
    }

    pub fn oracle_limits(mut self, limits: OracleLimits) -> Self {
        self.config.oracle = limits;
        self
    }

    pub fn max_parallel_images(mut self, n: usize) -> Self {
        self.config.max_parallel_images = n;
        self
    }

    pub fn aux_crop_size(mut self, size: Option<u32>) -> Self {
        self.config.aux_crop_size = size;
        self
    }

    pub fn per_region_outputs(mut self, enabled: bool) -> Self {
        self.config.per_region_outputs = enabled;
        self
    }

    /// Validate the configuration and build the pipeline.
    pub fn build(self) -> Result<MaskPipeline, MaskError> {
        MaskPipeline::new(self.oracle, self.config)
    }
}
