/// Axis-aligned region in source-image pixel space.
///
/// Stored in LTRB form, the order the compositing stages consume:
/// - `left`, `upper`: top-left corner
/// - `right`, `lower`: bottom-right corner (exclusive)
///
/// Coordinates are fractional until snapped with [`Region::to_pixels`].
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct Region {
    /// Left edge
    pub left: f64,
    /// Top edge
    pub upper: f64,
    /// Right edge (exclusive)
    pub right: f64,
    /// Bottom edge (exclusive)
    pub lower: f64,
}

/// A box after applying the display transform and clamping to the image.
pub type MappedRegion = Region;

/// A mapped region expanded by the padding fraction and clamped again.
pub type PaddedRegion = Region;

impl Region {
    /// Create a region from LTRB coordinates.
    #[inline]
    pub fn new(left: f64, upper: f64, right: f64, lower: f64) -> Self {
        Self {
            left,
            upper,
            right,
            lower,
        }
    }

    /// Create a region from TLWH format (top-left x, top-left y, width, height).
    #[inline]
    pub fn from_tlwh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Convert to LTRB format: (left, upper, right, lower).
    #[inline]
    pub fn to_ltrb(&self) -> [f64; 4] {
        [self.left, self.upper, self.right, self.lower]
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.lower - self.upper
    }

    /// True when either side has collapsed to zero (or below).
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Expand each side by `fraction` of the region's own width/height.
    ///
    /// The result is not clamped; total growth is `2 * fraction * dimension`.
    pub fn pad(&self, fraction: f64) -> Region {
        let pad_x = self.width() * fraction;
        let pad_y = self.height() * fraction;
        Region::new(
            self.left - pad_x,
            self.upper - pad_y,
            self.right + pad_x,
            self.lower + pad_y,
        )
    }

    /// Clamp to `[0, width] x [0, height]`.
    pub fn clamp(&self, width: u32, height: u32) -> Region {
        let (w, h) = (width as f64, height as f64);
        Region::new(
            self.left.clamp(0.0, w),
            self.upper.clamp(0.0, h),
            self.right.clamp(0.0, w),
            self.lower.clamp(0.0, h),
        )
    }

    /// Overlapping part of two regions, if any.
    pub fn intersection(&self, other: &Region) -> Option<Region> {
        let inter = Region::new(
            self.left.max(other.left),
            self.upper.max(other.upper),
            self.right.min(other.right),
            self.lower.min(other.lower),
        );
        (!inter.is_empty()).then_some(inter)
    }

    /// Snap outward to whole pixels. `None` when the region is empty.
    ///
    /// Negative coordinates saturate at zero, so callers clamp first.
    pub fn to_pixels(&self) -> Option<PixelRect> {
        if self.is_empty() {
            return None;
        }
        let left = self.left.floor().max(0.0) as u32;
        let upper = self.upper.floor().max(0.0) as u32;
        let right = self.right.ceil().max(0.0) as u32;
        let lower = self.lower.ceil().max(0.0) as u32;
        if right <= left || lower <= upper {
            return None;
        }
        Some(PixelRect::new(left, upper, right - left, lower - upper))
    }
}

/// Whole-pixel rectangle in TLWH form, always non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[inline]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    pub fn lower(&self) -> u32 {
        self.y + self.height
    }

    pub fn to_region(&self) -> Region {
        Region::from_tlwh(
            self.x as f64,
            self.y as f64,
            self.width as f64,
            self.height as f64,
        )
    }
}
