//! Pipeline configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MaskError;
use crate::extract::DEFAULT_PADDING;
use crate::geometry::DisplaySurface;

/// Which window a region's mask is written back into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Only the user-drawn box receives mask pixels; the padding is context.
    #[default]
    Unpadded,
    /// The whole padded window receives mask pixels.
    Padded,
}

/// Overlay colours and blend strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Region `i` is painted with `colors[i % colors.len()]`.
    pub colors: Vec<[u8; 3]>,
    /// Weight of the overlay colour on masked pixels.
    pub alpha: f32,
}

impl OverlayStyle {
    /// Masked pixels replaced by solid white.
    pub fn cutout() -> Self {
        Self {
            colors: vec![[255, 255, 255]],
            alpha: 1.0,
        }
    }

    /// Half-transparent red tint over masked pixels.
    pub fn highlight() -> Self {
        Self {
            colors: vec![[255, 0, 0]],
            alpha: 0.5,
        }
    }

    /// Colour for the region at `index`.
    pub fn color_for(&self, index: usize) -> [u8; 3] {
        self.colors
            .get(index % self.colors.len().max(1))
            .copied()
            .unwrap_or([255, 255, 255])
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::cutout()
    }
}

/// Limits applied to every oracle invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleLimits {
    /// Concurrent inferences allowed across all runs sharing the oracle.
    pub max_concurrent: usize,
    /// Deadline for one inference, counted from when it gets a slot.
    pub timeout_ms: u64,
    /// Longest wait for a free slot.
    pub queue_timeout_ms: u64,
}

impl OracleLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }
}

impl Default for OracleLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            timeout_ms: 30_000,
            queue_timeout_ms: 600_000,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of the box size added on each side of the oracle crop
    pub padding: f64,
    /// Compositing target for region masks
    pub placement: Placement,
    /// Annotation surface used when a record carries no size of its own
    pub display: DisplaySurface,
    /// Overlay colours and blend strength
    pub overlay: OverlayStyle,
    /// Oracle concurrency and deadline
    pub oracle: OracleLimits,
    /// Images processed concurrently by a batch
    pub max_parallel_images: usize,
    /// Side of the square auxiliary crop; `None` disables it
    pub aux_crop_size: Option<u32>,
    /// Also emit one composite per region
    pub per_region_outputs: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            placement: Placement::default(),
            display: DisplaySurface::default(),
            overlay: OverlayStyle::default(),
            oracle: OracleLimits::default(),
            max_parallel_images: 4,
            aux_crop_size: Some(512),
            per_region_outputs: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, MaskError> {
        let config: PipelineConfig =
            toml::from_str(raw).map_err(|e| MaskError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, MaskError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), MaskError> {
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(MaskError::Config(format!(
                "padding must be a non-negative number, got {}",
                self.padding
            )));
        }

        if !(0.0..=1.0).contains(&self.overlay.alpha) {
            return Err(MaskError::Config(format!(
                "overlay alpha must be within [0, 1], got {}",
                self.overlay.alpha
            )));
        }

        if self.overlay.colors.is_empty() {
            return Err(MaskError::Config(
                "overlay needs at least one colour".to_string(),
            ));
        }

        if self.oracle.max_concurrent == 0 {
            return Err(MaskError::Config(
                "oracle.max_concurrent must be at least 1".to_string(),
            ));
        }

        if self.oracle.timeout_ms == 0 {
            return Err(MaskError::Config(
                "oracle.timeout_ms must be positive".to_string(),
            ));
        }

        if self.oracle.queue_timeout_ms == 0 {
            return Err(MaskError::Config(
                "oracle.queue_timeout_ms must be positive".to_string(),
            ));
        }

        if self.max_parallel_images == 0 {
            return Err(MaskError::Config(
                "max_parallel_images must be at least 1".to_string(),
            ));
        }

        if self.aux_crop_size == Some(0) {
            return Err(MaskError::Config(
                "aux_crop_size must be positive when set".to_string(),
            ));
        }

        match self.display {
            DisplaySurface::FixedWidth { width } if !(width > 0.0) => Err(MaskError::Config(
                format!("display width must be positive, got {width}"),
            )),
            DisplaySurface::Surface { width, height } if !(width > 0.0 && height > 0.0) => {
                Err(MaskError::Config(format!(
                    "display surface must be positive, got {width}x{height}"
                )))
            }
            _ => Ok(()),
        }
    }
}
