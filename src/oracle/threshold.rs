//! Classical fallback segmenter: Otsu threshold on luma.

use image::RgbImage;
use image::imageops;
use imageproc::contrast::otsu_level;

use crate::error::OracleError;
use crate::oracle::{RegionMask, SegmentationOracle};

/// Splits a crop into two luma classes with Otsu's method and reports the
/// class that is less present along the crop border as the object.
///
/// Works for the common case of one object on a plain background with the
/// padded window providing the background sample.
#[derive(Debug, Clone, Default)]
pub struct LumaThresholdOracle {
    /// Masks covering less than this fraction of the crop are dropped.
    min_coverage: f32,
}

impl LumaThresholdOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_coverage(mut self, fraction: f32) -> Self {
        self.min_coverage = fraction;
        self
    }
}

impl SegmentationOracle for LumaThresholdOracle {
    fn predict(&self, crop: &RgbImage) -> Result<Vec<RegionMask>, OracleError> {
        let (width, height) = crop.dimensions();
        if width == 0 || height == 0 {
            return Err(OracleError::InvalidInput("empty crop".to_string()));
        }

        let gray = imageops::grayscale(crop);
        let level = otsu_level(&gray);
        // Otsu's level is the last value of the darker class.
        let dark = |x: u32, y: u32| gray.get_pixel(x, y).0[0] <= level;

        // Sample the border to decide which class is background.
        let mut border = 0usize;
        let mut border_dark = 0usize;
        for x in 0..width {
            for y in [0, height - 1] {
                border += 1;
                border_dark += dark(x, y) as usize;
            }
        }
        for y in 0..height {
            for x in [0, width - 1] {
                border += 1;
                border_dark += dark(x, y) as usize;
            }
        }
        let foreground_is_dark = border_dark * 2 <= border;

        let mask = RegionMask::from_fn(height as usize, width as usize, |x, y| {
            dark(x as u32, y as u32) == foreground_is_dark
        });

        let coverage = mask.count() as f32 / (width as f32 * height as f32);
        if mask.count() == 0 || coverage < self.min_coverage {
            return Ok(vec![]);
        }
        Ok(vec![mask])
    }

    fn name(&self) -> &str {
        "luma-threshold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Dark square on a light background.
    fn dark_blob() -> RgbImage {
        RgbImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                Rgb([20, 20, 20])
            } else {
                Rgb([230, 230, 230])
            }
        })
    }

    #[test]
    fn test_dark_object_on_light_background() {
        let masks = LumaThresholdOracle::new().predict(&dark_blob()).unwrap();
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].count(), 100);
        assert!(masks[0].get(10, 10));
        assert!(!masks[0].get(0, 0));
    }

    #[test]
    fn test_light_object_on_dark_background() {
        let mut crop = dark_blob();
        imageops::invert(&mut crop);
        let masks = LumaThresholdOracle::new().predict(&crop).unwrap();
        assert_eq!(masks.len(), 1);
        assert!(masks[0].get(10, 10));
        assert!(!masks[0].get(19, 19));
    }

    #[test]
    fn test_uniform_crop_finds_nothing() {
        let crop = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        assert!(LumaThresholdOracle::new().predict(&crop).unwrap().is_empty());
    }

    #[test]
    fn test_min_coverage() {
        let oracle = LumaThresholdOracle::new().with_min_coverage(0.5);
        assert!(oracle.predict(&dark_blob()).unwrap().is_empty());
    }
}
