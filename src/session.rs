//! The editing session: owned live drawing state.
//!
//! One [`EditingSession`] exists per open image or project and is passed by
//! reference to the extractor and the persistence orchestrator; there is no
//! process-wide singleton. Change detection is structural: every mutation of
//! the layer or feature sequences bumps a revision counter, so observers
//! compare revisions instead of being notified.

use crate::extract::{DrawingSurface, ShapeRef};
use crate::model::{AnnotationDocument, FeatureClass, Geometry};

/// A shape being edited on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveShape {
    /// Identity tag, present once the shape has been through a save.
    pub id: Option<String>,

    /// Class annotation.
    pub class: Option<String>,

    /// Geometry; `None` while the shape is still forming.
    pub geometry: Option<Geometry>,
}

impl LiveShape {
    /// Create a shape with resolved geometry and no identity yet.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            class: None,
            geometry: Some(geometry),
        }
    }

    /// Set the class annotation.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

/// One z-order band of live shapes.
#[derive(Debug, Clone, PartialEq)]
struct LiveLayer {
    id: String,
    shapes: Vec<LiveShape>,
}

/// Live drawing state for the active image or project.
#[derive(Debug, Clone, Default)]
pub struct EditingSession {
    classes: Vec<FeatureClass>,
    layers: Vec<LiveLayer>,
    revision: u64,
}

impl EditingSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Structural revision; bumped on every mutation of the layer or
    /// feature sequences.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total number of live shapes.
    pub fn shape_count(&self) -> usize {
        self.layers.iter().map(|l| l.shapes.len()).sum()
    }

    /// Append a class to the legend.
    pub fn add_class(&mut self, class: FeatureClass) {
        self.classes.push(class);
        self.revision += 1;
    }

    /// Append an empty layer. Returns false if the id is already taken.
    pub fn add_layer(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.layers.iter().any(|l| l.id == id) {
            log::warn!("layer '{}' already exists", id);
            return false;
        }
        self.layers.push(LiveLayer { id, shapes: Vec::new() });
        self.revision += 1;
        true
    }

    /// Append a shape to a layer. Returns false if the layer is unknown.
    pub fn add_shape(&mut self, layer_id: &str, shape: LiveShape) -> bool {
        let Some(layer) = self.layers.iter_mut().find(|l| l.id == layer_id) else {
            log::warn!("cannot add shape: unknown layer '{}'", layer_id);
            return false;
        };
        layer.shapes.push(shape);
        self.revision += 1;
        true
    }

    /// Remove the shape with the given identity tag from any layer.
    pub fn remove_shape(&mut self, shape_id: &str) -> bool {
        for layer in &mut self.layers {
            if let Some(pos) = layer
                .shapes
                .iter()
                .position(|s| s.id.as_deref() == Some(shape_id))
            {
                layer.shapes.remove(pos);
                self.revision += 1;
                return true;
            }
        }
        false
    }

    /// Replace the whole session with the contents of a loaded document.
    ///
    /// Invoked when a project or image is (re)loaded; the previous session
    /// state is superseded.
    pub fn load_document(&mut self, document: &AnnotationDocument) {
        self.classes = document.classes.clone();
        self.layers = document
            .layers
            .iter()
            .map(|layer| LiveLayer {
                id: layer.id.clone(),
                shapes: layer
                    .features
                    .iter()
                    .map(|f| LiveShape {
                        id: Some(f.id.clone()),
                        class: f.class.clone(),
                        geometry: Some(f.geometry.clone()),
                    })
                    .collect(),
            })
            .collect();
        self.revision += 1;
        log::info!(
            "session loaded: {} layers, {} shapes",
            self.layer_count(),
            self.shape_count()
        );
    }
}

impl DrawingSurface for EditingSession {
    fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    fn shapes(&self, layer_id: &str) -> Vec<ShapeRef> {
        self.layers
            .iter()
            .find(|l| l.id == layer_id)
            .map(|l| {
                l.shapes
                    .iter()
                    .map(|s| ShapeRef {
                        id: s.id.clone(),
                        class: s.class.clone(),
                        geometry: s.geometry.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn classes(&self) -> Vec<FeatureClass> {
        self.classes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract;
    use crate::model::{Feature, Layer};

    #[test]
    fn test_mutations_bump_revision() {
        let mut session = EditingSession::new();
        let r0 = session.revision();

        session.add_layer("base");
        let r1 = session.revision();
        assert!(r1 > r0);

        session.add_shape("base", LiveShape::new(Geometry::Point([1.0, 2.0])));
        assert!(session.revision() > r1);
    }

    #[test]
    fn test_unknown_layer_rejected_without_revision_bump() {
        let mut session = EditingSession::new();
        let r0 = session.revision();
        assert!(!session.add_shape("missing", LiveShape::new(Geometry::Point([0.0, 0.0]))));
        assert_eq!(session.revision(), r0);
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let mut session = EditingSession::new();
        assert!(session.add_layer("base"));
        assert!(!session.add_layer("base"));
        assert_eq!(session.layer_count(), 1);
    }

    #[test]
    fn test_remove_shape_by_id() {
        let mut session = EditingSession::new();
        session.add_layer("base");
        let mut shape = LiveShape::new(Geometry::Point([0.0, 0.0]));
        shape.id = Some("s1".to_string());
        session.add_shape("base", shape);

        assert!(session.remove_shape("s1"));
        assert_eq!(session.shape_count(), 0);
        assert!(!session.remove_shape("s1"));
    }

    #[test]
    fn test_load_document_rebuilds_session() {
        let mut doc = AnnotationDocument::empty();
        doc.classes.push(FeatureClass::new("vessel"));
        doc.layers.push(Layer {
            id: "layer-1".to_string(),
            features: vec![Feature {
                id: "f1".to_string(),
                class: Some("vessel".to_string()),
                geometry: Geometry::Point([4.0, 5.0]),
            }],
        });

        let mut session = EditingSession::new();
        session.add_layer("stale");
        session.load_document(&doc);

        assert_eq!(session.layer_count(), 1);
        assert_eq!(session.layer_ids(), ["layer-1"]);
        assert_eq!(session.shape_count(), 1);
        assert_eq!(session.classes()[0].label, "vessel");
    }

    #[test]
    fn test_session_round_trips_through_snapshot() {
        let mut session = EditingSession::new();
        session.add_class(FeatureClass::new("vessel"));
        session.add_layer("base");
        session.add_shape(
            "base",
            LiveShape::new(Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]))
                .with_class("vessel"),
        );

        let doc = extract::snapshot(&session);
        let mut restored = EditingSession::new();
        restored.load_document(&doc);

        // Snapshot assigns identities; apart from that the state matches
        assert_eq!(restored.layer_ids(), session.layer_ids());
        assert_eq!(restored.shape_count(), session.shape_count());
        assert_eq!(restored.classes(), session.classes());
        assert!(restored.shapes("base")[0].id.is_some());
    }
}
