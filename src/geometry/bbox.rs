use serde::{Deserialize, Serialize};

use crate::error::MaskError;

/// Box drawn on the annotation surface, in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    /// Reject non-finite coordinates and negative sizes.
    ///
    /// Zero-sized boxes are well formed; extraction skips them as empty
    /// regions.
    pub fn validate(&self) -> Result<(), MaskError> {
        let finite = [self.min_x, self.min_y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(MaskError::MalformedAnnotations(format!(
                "non-finite box coordinates: {self:?}"
            )));
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(MaskError::MalformedAnnotations(format!(
                "box size must not be negative, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
