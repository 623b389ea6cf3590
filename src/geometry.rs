//! Geometry shared by the pipeline stages: annotation boxes, display
//! transforms and image-space regions.

mod bbox;
mod rect;
mod transform;

pub use bbox::BoundingBox;
pub use rect::{MappedRegion, PaddedRegion, PixelRect, Region};
pub use transform::{DisplaySurface, DisplayTransform};
