//! Geometry extraction from the live drawing surface.
//!
//! The drawing canvas is an external collaborator; this module sees it only
//! through the [`DrawingSurface`] query interface and turns its shapes into a
//! consistent [`AnnotationDocument`] snapshot.

use uuid::Uuid;

use crate::model::{AnnotationDocument, Feature, FeatureClass, Geometry, Layer};

/// A shape as reported by the drawing surface.
///
/// Everything is optional except implicitly the geometry: shapes whose
/// geometry has not resolved yet are a normal transient state during
/// interactive editing and are skipped on extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRef {
    /// Existing identity tag, if the shape has been saved before.
    pub id: Option<String>,

    /// Class annotation on the shape, if any.
    pub class: Option<String>,

    /// Resolved geometry, if any.
    pub geometry: Option<Geometry>,
}

impl ShapeRef {
    /// Create a shape reference with just a geometry.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            class: None,
            geometry: Some(geometry),
        }
    }

    /// Set the identity tag.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the class annotation.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

/// Query interface of the active drawing surface.
pub trait DrawingSurface {
    /// Layer identifiers in paint order.
    fn layer_ids(&self) -> Vec<String>;

    /// Shapes in a layer, in draw order. Unknown layers yield no shapes.
    fn shapes(&self, layer_id: &str) -> Vec<ShapeRef>;

    /// Class legend in declaration order.
    fn classes(&self) -> Vec<FeatureClass>;
}

/// Build an annotation document from the current surface state.
///
/// Pure read: the surface is not mutated. The returned document carries a
/// fresh header timestamp and reflects a single consistent snapshot.
pub fn snapshot(surface: &impl DrawingSurface) -> AnnotationDocument {
    let mut document = AnnotationDocument::empty();
    document.classes = surface.classes();
    document.layers = surface
        .layer_ids()
        .into_iter()
        .map(|id| {
            let features = surface
                .shapes(&id)
                .into_iter()
                .filter_map(feature_from_shape)
                .collect();
            Layer { id, features }
        })
        .collect();

    log::debug!(
        "extracted {} features across {} layers",
        document.feature_count(),
        document.layers.len()
    );
    document
}

/// Convert one reported shape into a feature, or skip it.
fn feature_from_shape(shape: ShapeRef) -> Option<Feature> {
    // Orphaned handles without geometry are expected mid-edit; not an error
    let geometry = shape.geometry?;
    Some(Feature {
        id: shape.id.unwrap_or_else(generate_feature_id),
        class: shape.class,
        geometry,
    })
}

/// Generate a fresh feature identity.
///
/// Random rather than sequential so identities stay stable under concurrent
/// layer edits, with negligible collision probability over a document's
/// lifetime.
pub fn generate_feature_id() -> String {
    Uuid::new_v4().to_string()
}
