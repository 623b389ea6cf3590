//! Annotation records keyed by image identifier.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MaskError;
use crate::geometry::{BoundingBox, DisplaySurface};

/// Stable identifier correlating an image with its annotations (its file name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier from a stored key that may carry a URL path such as
    /// `/static/cat.png`; only the final segment is kept.
    pub fn from_key(key: &str) -> Self {
        let name = key.rsplit('/').next().unwrap_or(key);
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The boxes drawn on one image, in drawing order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationSet {
    pub boxes: Vec<BoundingBox>,
    /// Surface the boxes were drawn on, when the record says so.
    pub surface: Option<DisplaySurface>,
}

impl AnnotationSet {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self {
            boxes,
            surface: None,
        }
    }

    pub fn with_surface(mut self, surface: DisplaySurface) -> Self {
        self.surface = Some(surface);
        self
    }

    /// The recorded surface, or `fallback` when none was recorded.
    pub fn surface_or(&self, fallback: DisplaySurface) -> DisplaySurface {
        self.surface.unwrap_or(fallback)
    }

    pub fn validate(&self) -> Result<(), MaskError> {
        for bbox in &self.boxes {
            bbox.validate()?;
        }
        Ok(())
    }
}

/// Source of annotation sets.
pub trait AnnotationStore: Send + Sync {
    /// Annotations for `id`; `MalformedAnnotations` if missing or invalid.
    fn annotations(&self, id: &ImageId) -> Result<AnnotationSet, MaskError>;

    /// Every image the store has a record for, in a stable order.
    fn image_ids(&self) -> Vec<ImageId>;
}

#[derive(Deserialize)]
struct RawDocument {
    annotations: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    bounding_boxes: Vec<BoundingBox>,
    #[serde(default)]
    canvas_width: Option<f64>,
    #[serde(default)]
    canvas_height: Option<f64>,
}

/// Annotations in the annotation tool's JSON document:
///
/// ```json
/// {"annotations": {"/static/cat.png": {"boundingBoxes": [
///     {"minX": 10, "minY": 10, "width": 20, "height": 20}
/// ]}}}
/// ```
///
/// Records are parsed per image on lookup, so one malformed record only
/// affects its own image.
#[derive(Debug, Clone, Default)]
pub struct JsonAnnotationStore {
    records: BTreeMap<ImageId, serde_json::Value>,
}

impl JsonAnnotationStore {
    pub fn from_json_str(raw: &str) -> Result<Self, MaskError> {
        let doc: RawDocument = serde_json::from_str(raw)
            .map_err(|e| MaskError::MalformedAnnotations(e.to_string()))?;

        let mut records = BTreeMap::new();
        for (key, record) in doc.annotations {
            let id = ImageId::from_key(&key);
            if records.insert(id.clone(), record).is_some() {
                warn!(image = %id, key = %key, "duplicate annotation record, keeping the last");
            }
        }
        Ok(Self { records })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MaskError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AnnotationStore for JsonAnnotationStore {
    fn annotations(&self, id: &ImageId) -> Result<AnnotationSet, MaskError> {
        let value = self.records.get(id).ok_or_else(|| {
            MaskError::MalformedAnnotations(format!("no annotation record for {id}"))
        })?;
        let record: RawRecord = serde_json::from_value(value.clone())
            .map_err(|e| MaskError::MalformedAnnotations(format!("{id}: {e}")))?;

        let surface = match (record.canvas_width, record.canvas_height) {
            (Some(width), Some(height)) => Some(DisplaySurface::Surface { width, height }),
            (Some(width), None) => Some(DisplaySurface::FixedWidth { width }),
            _ => None,
        };
        let set = AnnotationSet {
            boxes: record.bounding_boxes,
            surface,
        };
        set.validate()?;
        Ok(set)
    }

    fn image_ids(&self) -> Vec<ImageId> {
        self.records.keys().cloned().collect()
    }
}
