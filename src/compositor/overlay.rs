use image::{Rgb, RgbImage};
use ndarray::Array2;

use crate::geometry::PixelRect;
use crate::oracle::RegionMask;

/// Full-image overlay, black until regions paint into it.
///
/// `footprint` records which pixels any region has painted, so blending can
/// leave everything else untouched.
#[derive(Debug, Clone)]
pub struct OverlayBuffer {
    pixels: RgbImage,
    footprint: Array2<bool>,
}

impl OverlayBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbImage::new(width, height),
            footprint: Array2::from_elem((height as usize, width as usize), false),
        }
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    #[inline]
    pub fn is_painted(&self, x: u32, y: u32) -> bool {
        self.footprint
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(false)
    }

    /// Number of painted pixels.
    pub fn covered(&self) -> usize {
        self.footprint.iter().filter(|&&v| v).count()
    }

    /// Paint `color` wherever `mask` is set inside `target`.
    ///
    /// `mask` is laid out over `frame`; only the part of `target` that lies
    /// within both `frame` and the image is visited. Unset mask pixels leave
    /// the overlay as it was.
    pub fn paint(
        &mut self,
        mask: &RegionMask,
        frame: PixelRect,
        target: PixelRect,
        color: [u8; 3],
    ) -> usize {
        let (width, height) = self.dimensions();
        let x_end = target.right().min(frame.right()).min(width);
        let y_end = target.lower().min(frame.lower()).min(height);
        let x_start = target.x.max(frame.x);
        let y_start = target.y.max(frame.y);

        let mut painted = 0;
        for y in y_start..y_end {
            for x in x_start..x_end {
                let (mx, my) = ((x - frame.x) as usize, (y - frame.y) as usize);
                if mask.get(mx, my) {
                    self.pixels.put_pixel(x, y, Rgb(color));
                    self.footprint[[y as usize, x as usize]] = true;
                    painted += 1;
                }
            }
        }
        painted
    }
}
