use crate::error::MaskError;

/// Stage reached by one image's processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Nothing loaded yet
    #[default]
    Idle,
    /// Image decoded and annotations read
    Loaded,
    /// Cutting the padded crop for a region
    Extracting,
    /// Waiting on the oracle for a region
    Segmenting,
    /// Painting a region's masks into the overlay
    Compositing,
    /// Overlay blended onto the image
    Blended,
    /// Output handed back
    Done,
}

/// Final state of one region within a run.
#[derive(Debug)]
pub enum RegionState {
    /// Masks merged and painted
    Composited { masks: usize, painted: usize },
    /// Region dropped; the run carried on with the next box
    Skipped(MaskError),
}

impl RegionState {
    pub fn is_composited(&self) -> bool {
        matches!(self, RegionState::Composited { .. })
    }
}
