//! Data model for annotation documents and project manifests.

mod document;
mod manifest;

pub use document::{
    AnnotationDocument, Feature, FeatureClass, Geometry, Header, Layer, SCHEMA_VERSION,
};
pub(crate) use document::now_ms;
pub use manifest::{EditorState, ImageEntry, ImageStrategy, ProjectManifest};
