//! Mapping from annotation-surface coordinates to source-image pixels.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::MaskError;
use crate::geometry::{BoundingBox, MappedRegion, Region};

/// How the annotation surface relates to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplaySurface {
    /// Boxes were drawn at the image's native resolution.
    #[default]
    Native,
    /// Fixed-width canvas; height follows the image's aspect ratio.
    FixedWidth { width: f64 },
    /// Canvas with an independently measured size.
    Surface { width: f64, height: f64 },
}

/// Scale factors from surface space to image pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    scale: Vector2<f64>,
    image_width: u32,
    image_height: u32,
}

impl DisplayTransform {
    /// Surface and image share one coordinate space.
    pub fn identity(image_width: u32, image_height: u32) -> Result<Self, MaskError> {
        check_image(image_width, image_height)?;
        Ok(Self {
            scale: Vector2::new(1.0, 1.0),
            image_width,
            image_height,
        })
    }

    /// Surface of `surface_width x surface_height` showing the whole image.
    pub fn from_surface(
        surface_width: f64,
        surface_height: f64,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, MaskError> {
        check_image(image_width, image_height)?;
        if !(surface_width > 0.0 && surface_height > 0.0)
            || !surface_width.is_finite()
            || !surface_height.is_finite()
        {
            return Err(MaskError::InvalidTransform(format!(
                "surface size must be positive, got {surface_width}x{surface_height}"
            )));
        }
        Ok(Self {
            scale: Vector2::new(
                image_width as f64 / surface_width,
                image_height as f64 / surface_height,
            ),
            image_width,
            image_height,
        })
    }

    /// Fixed-width surface. The surface height is implied by the image's
    /// aspect ratio, and `scale_y` is derived from that implied height.
    pub fn from_display_width(
        display_width: f64,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, MaskError> {
        check_image(image_width, image_height)?;
        if !(display_width > 0.0) || !display_width.is_finite() {
            return Err(MaskError::InvalidTransform(format!(
                "display width must be positive, got {display_width}"
            )));
        }
        let display_height = (image_height as f64 / image_width as f64) * display_width;
        Self::from_surface(display_width, display_height, image_width, image_height)
    }

    /// Build the transform a [`DisplaySurface`] describes for a given image.
    pub fn for_surface(
        surface: &DisplaySurface,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, MaskError> {
        match *surface {
            DisplaySurface::Native => Self::identity(image_width, image_height),
            DisplaySurface::FixedWidth { width } => {
                Self::from_display_width(width, image_width, image_height)
            }
            DisplaySurface::Surface { width, height } => {
                Self::from_surface(width, height, image_width, image_height)
            }
        }
    }

    #[inline]
    pub fn scale_x(&self) -> f64 {
        self.scale.x
    }

    #[inline]
    pub fn scale_y(&self) -> f64 {
        self.scale.y
    }

    /// Map a surface box into image pixels, clamped to the image bounds.
    ///
    /// A box lying outside the image collapses to an empty region rather than
    /// failing here; extraction reports it.
    pub fn map(&self, bbox: &BoundingBox) -> MappedRegion {
        let top_left = Point2::new(bbox.min_x, bbox.min_y)
            .coords
            .component_mul(&self.scale);
        let size = Vector2::new(bbox.width, bbox.height).component_mul(&self.scale);
        let bottom_right = top_left + size;

        Region::new(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
            .clamp(self.image_width, self.image_height)
    }
}

fn check_image(width: u32, height: u32) -> Result<(), MaskError> {
    if width == 0 || height == 0 {
        return Err(MaskError::InvalidTransform(format!(
            "image dimensions must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}
