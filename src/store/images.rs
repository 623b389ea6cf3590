use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use image::RgbImage;

use crate::error::MaskError;
use crate::store::ImageId;

/// Readable RGB images keyed by [`ImageId`].
pub trait ImageSource: Send + Sync {
    /// Decode `id`; any failure is [`MaskError::ImageUnreadable`].
    fn load(&self, id: &ImageId) -> Result<RgbImage, MaskError>;
}

/// Images stored as files named by their identifier inside one directory.
#[derive(Debug, Clone)]
pub struct DirImageSource {
    root: PathBuf,
}

impl DirImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &ImageId) -> Result<PathBuf, MaskError> {
        let relative = Path::new(id.as_str());
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !plain || id.as_str().is_empty() {
            return Err(MaskError::ImageUnreadable {
                id: id.to_string(),
                reason: "identifier is not a plain file name".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl ImageSource for DirImageSource {
    fn load(&self, id: &ImageId) -> Result<RgbImage, MaskError> {
        let path = self.path_for(id)?;
        let decoded = image::open(&path).map_err(|e| MaskError::ImageUnreadable {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(decoded.to_rgb8())
    }
}

/// Images already decoded in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    images: HashMap<ImageId, RgbImage>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<ImageId>, image: RgbImage) {
        self.images.insert(id.into(), image);
    }

    pub fn with_image(mut self, id: impl Into<ImageId>, image: RgbImage) -> Self {
        self.insert(id, image);
        self
    }
}

impl ImageSource for MemoryImageSource {
    fn load(&self, id: &ImageId) -> Result<RgbImage, MaskError> {
        self.images
            .get(id)
            .cloned()
            .ok_or_else(|| MaskError::ImageUnreadable {
                id: id.to_string(),
                reason: "no such image".to_string(),
            })
    }
}
