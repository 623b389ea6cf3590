use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;
use parking_lot::Mutex;

use crate::error::MaskError;
use crate::store::ImageId;

/// Deterministic names for everything a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputName<'a> {
    /// All regions blended onto the image: `masked_<id>`
    Composite(&'a ImageId),
    /// One region blended onto the image: `masked_<index>_<id>`
    RegionComposite { index: usize, id: &'a ImageId },
    /// Padded, resized crop of one region: `cropped_<index>_<id>`
    AuxCrop { index: usize, id: &'a ImageId },
}

impl fmt::Display for OutputName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputName::Composite(id) => write!(f, "masked_{id}"),
            OutputName::RegionComposite { index, id } => write!(f, "masked_{index}_{id}"),
            OutputName::AuxCrop { index, id } => write!(f, "cropped_{index}_{id}"),
        }
    }
}

/// Destination for finished images.
pub trait OutputSink: Send + Sync {
    fn write(&self, name: &OutputName<'_>, image: &RgbImage) -> Result<(), MaskError>;
}

/// Writes each output to `<root>/<name>`, encoded by the name's extension.
#[derive(Debug, Clone)]
pub struct DirOutputSink {
    root: PathBuf,
}

impl DirOutputSink {
    /// Create the sink, making `root` if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, MaskError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &OutputName<'_>) -> PathBuf {
        self.root.join(name.to_string())
    }
}

impl OutputSink for DirOutputSink {
    fn write(&self, name: &OutputName<'_>, image: &RgbImage) -> Result<(), MaskError> {
        image.save(self.path_for(name))?;
        Ok(())
    }
}

/// Keeps outputs in memory, keyed by name.
#[derive(Debug, Default)]
pub struct MemoryOutputSink {
    images: Mutex<BTreeMap<String, RgbImage>>,
}

impl MemoryOutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<RgbImage> {
        self.images.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.images.lock().keys().cloned().collect()
    }
}

impl OutputSink for MemoryOutputSink {
    fn write(&self, name: &OutputName<'_>, image: &RgbImage) -> Result<(), MaskError> {
        self.images.lock().insert(name.to_string(), image.clone());
        Ok(())
    }
}
