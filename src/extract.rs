//! Region extraction: padded crop windows cut from the source image.

use image::RgbImage;
use image::imageops::{self, FilterType};

use crate::error::MaskError;
use crate::geometry::{MappedRegion, PaddedRegion, PixelRect};

/// Padding used when none is configured.
pub const DEFAULT_PADDING: f64 = 0.1;

/// Pixels handed to the oracle for one box, plus where they came from.
#[derive(Debug, Clone)]
pub struct RegionCrop {
    /// Position of the box in annotation order
    pub index: usize,
    /// The user-drawn box in image pixels
    pub mapped: PixelRect,
    /// The padded crop window in image pixels; contains `mapped`
    pub padded: PixelRect,
    /// Cropped source pixels, `padded.width x padded.height`
    pub pixels: RgbImage,
}

/// Compute the padded window for `region`, clamped to the image.
pub fn padded_region(region: &MappedRegion, padding: f64, width: u32, height: u32) -> PaddedRegion {
    region.pad(padding).clamp(width, height)
}

/// Crop the padded window around `region` out of `image`.
///
/// Fails with [`MaskError::EmptyRegion`] when the box or its padded window
/// has no pixels left after clamping.
pub fn extract(
    image: &RgbImage,
    index: usize,
    region: &MappedRegion,
    padding: f64,
) -> Result<RegionCrop, MaskError> {
    let (width, height) = image.dimensions();
    let padded_region = padded_region(region, padding, width, height);

    let padded = padded_region.to_pixels().ok_or_else(|| {
        MaskError::empty_region(
            index,
            format!("padded window {:?} is empty", padded_region.to_ltrb()),
        )
    })?;
    let mapped = region.to_pixels().ok_or_else(|| {
        MaskError::empty_region(index, format!("box {:?} is empty", region.to_ltrb()))
    })?;

    let pixels = imageops::crop_imm(image, padded.x, padded.y, padded.width, padded.height)
        .to_image();

    Ok(RegionCrop {
        index,
        mapped,
        padded,
        pixels,
    })
}

/// Square resize of the padded crop, kept as a side artifact.
pub fn auxiliary_crop(crop: &RegionCrop, size: u32) -> RgbImage {
    imageops::resize(&crop.pixels, size, size, FilterType::Lanczos3)
}
