//! Collaborators at the pipeline boundary: where annotations and images come
//! from and where finished outputs go.

mod annotations;
mod images;
mod sink;

pub use annotations::{AnnotationSet, AnnotationStore, ImageId, JsonAnnotationStore};
pub use images::{DirImageSource, ImageSource, MemoryImageSource};
pub use sink::{DirOutputSink, MemoryOutputSink, OutputName, OutputSink};
