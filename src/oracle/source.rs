//! Trait for segmentation backends and the mask type they produce.

use image::RgbImage;
use ndarray::{Array2, Array3, Axis, Zip};

use crate::error::OracleError;

/// Boolean foreground mask for one object instance, shaped `(height, width)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMask(Array2<bool>);

impl RegionMask {
    pub fn new(mask: Array2<bool>) -> Self {
        Self(mask)
    }

    /// Mask with every pixel marked foreground.
    pub fn full(height: usize, width: usize) -> Self {
        Self(Array2::from_elem((height, width), true))
    }

    /// Build a mask from a per-pixel predicate taking `(x, y)`.
    pub fn from_fn(height: usize, width: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        Self(Array2::from_shape_fn((height, width), |(y, x)| f(x, y)))
    }

    /// `(height, width)`
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        self.0.dim()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.0.get((y, x)).copied().unwrap_or(false)
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&v| v).count()
    }

    /// Logical OR of same-shaped masks. `None` for an empty slice or when
    /// the shapes disagree.
    pub fn union(masks: &[RegionMask]) -> Option<RegionMask> {
        let (first, rest) = masks.split_first()?;
        if rest.iter().any(|m| m.dims() != first.dims()) {
            return None;
        }
        let mut merged = first.0.clone();
        for mask in rest {
            Zip::from(&mut merged)
                .and(&mask.0)
                .for_each(|acc, &v| *acc |= v);
        }
        Some(RegionMask(merged))
    }
}

impl From<Array2<bool>> for RegionMask {
    fn from(mask: Array2<bool>) -> Self {
        Self(mask)
    }
}

/// A segmentation capability: given crop pixels, return zero or more
/// foreground masks covering that crop.
///
/// Implementations are shared between concurrent pipeline runs, so they take
/// `&self`; backends needing exclusive access serialise internally or rely on
/// the adapter's concurrency limit.
///
/// # Example
///
/// ```ignore
/// use boxmask_rs::{OracleError, RegionMask, SegmentationOracle};
///
/// struct MySegmenter {
///     // Your model here
/// }
///
/// impl SegmentationOracle for MySegmenter {
///     fn predict(&self, crop: &image::RgbImage) -> Result<Vec<RegionMask>, OracleError> {
///         // Run inference and return masks sized to the crop
///         Ok(vec![])
///     }
/// }
/// ```
pub trait SegmentationOracle: Send + Sync {
    /// Segment `crop`. Each returned mask must be `crop.height() x crop.width()`.
    fn predict(&self, crop: &RgbImage) -> Result<Vec<RegionMask>, OracleError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "oracle"
    }
}

/// Helper trait for converting model-specific outputs to `RegionMask`s.
pub trait IntoRegionMasks {
    fn into_region_masks(self) -> Vec<RegionMask>;
}

/// Stacked `(instances, height, width)` output.
impl IntoRegionMasks for Array3<bool> {
    fn into_region_masks(self) -> Vec<RegionMask> {
        self.axis_iter(Axis(0))
            .map(|plane| RegionMask::new(plane.to_owned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_is_logical_or() {
        let a = RegionMask::from_fn(2, 3, |x, _| x == 0);
        let b = RegionMask::from_fn(2, 3, |_, y| y == 1);
        let merged = RegionMask::union(&[a, b]).unwrap();

        assert!(merged.get(0, 0));
        assert!(!merged.get(1, 0));
        assert!(merged.get(2, 1));
        assert_eq!(merged.count(), 4);
    }

    #[test]
    fn test_union_empty() {
        assert!(RegionMask::union(&[]).is_none());
    }

    #[test]
    fn test_union_rejects_mixed_shapes() {
        let masks = [RegionMask::full(2, 3), RegionMask::full(3, 2)];
        assert!(RegionMask::union(&masks).is_none());
    }

    #[test]
    fn test_stacked_into_masks() {
        let mut stacked = Array3::from_elem((2, 4, 5), false);
        stacked[[1, 3, 4]] = true;
        let masks = stacked.into_region_masks();

        assert_eq!(masks.len(), 2);
        assert_eq!(masks[0].dims(), (4, 5));
        assert_eq!(masks[0].count(), 0);
        assert!(masks[1].get(4, 3));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let mask = RegionMask::full(2, 2);
        assert!(!mask.get(2, 0));
    }
}
