//! Mask compositing: region masks are painted into a full-size overlay in
//! annotation order, then blended onto the source image.

mod blend;
mod overlay;

pub use blend::blend_footprint;
pub use overlay::OverlayBuffer;

use image::RgbImage;

use crate::config::{OverlayStyle, Placement};
use crate::geometry::PixelRect;
use crate::oracle::RegionMask;

/// Oracle output for one box, positioned in the source image.
#[derive(Debug, Clone)]
pub struct PlacedMasks {
    /// Position of the box in annotation order
    pub index: usize,
    /// The user-drawn box
    pub mapped: PixelRect,
    /// The crop window the masks were computed on
    pub padded: PixelRect,
    /// Instance masks, each `padded.height x padded.width`
    pub masks: Vec<RegionMask>,
}

impl PlacedMasks {
    /// Window that receives mask pixels under `placement`.
    pub fn target(&self, placement: Placement) -> PixelRect {
        match placement {
            Placement::Unpadded => self.mapped,
            Placement::Padded => self.padded,
        }
    }
}

/// Blended image plus how much of it the overlay touched.
#[derive(Debug, Clone)]
pub struct CompositedOutput {
    pub image: RgbImage,
    /// Pixels covered by at least one region mask
    pub covered_pixels: usize,
}

#[derive(Debug, Clone)]
pub struct Compositor {
    placement: Placement,
    style: OverlayStyle,
}

impl Compositor {
    pub fn new(placement: Placement, style: OverlayStyle) -> Self {
        Self { placement, style }
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// OR the region's masks together and paint the result. Pixels outside
    /// the merged mask keep whatever earlier regions wrote there.
    ///
    /// Returns the number of pixels painted. Zero masks, or masks whose
    /// shapes disagree, paint nothing.
    pub fn paint_region(&self, overlay: &mut OverlayBuffer, region: &PlacedMasks) -> usize {
        let Some(merged) = RegionMask::union(&region.masks) else {
            return 0;
        };
        overlay.paint(
            &merged,
            region.padded,
            region.target(self.placement),
            self.style.color_for(region.index),
        )
    }

    /// Blend the overlay onto `image`, touching only the masked footprint.
    pub fn blend(&self, image: &RgbImage, overlay: &OverlayBuffer) -> CompositedOutput {
        CompositedOutput {
            image: blend_footprint(image, overlay, self.style.alpha),
            covered_pixels: overlay.covered(),
        }
    }

    /// Paint every region in order into a fresh overlay and blend.
    pub fn composite(&self, image: &RgbImage, regions: &[PlacedMasks]) -> CompositedOutput {
        let mut overlay = OverlayBuffer::new(image.width(), image.height());
        for region in regions {
            self.paint_region(&mut overlay, region);
        }
        self.blend(image, &overlay)
    }
}
