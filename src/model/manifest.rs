//! Project manifest and editor-state documents.
//!
//! A project manifest references one or more images, the canonical location
//! of the annotation document, and an editor-state blob. This core reads the
//! manifest but never writes it; the editor blob passes through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// External project manifest, read-only to this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Canonical annotation document path, if the project declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,

    /// Images in display order.
    #[serde(default)]
    pub images: Vec<ImageEntry>,

    /// Opaque editor-state blob, forwarded without interpretation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<Value>,
}

/// One image referenced by a project manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    /// Display name.
    pub name: String,

    /// Source path or URL; its suffix selects the loading strategy.
    pub source: String,

    /// Further manifest fields (opacity, role, ...), carried through.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ImageEntry {
    /// Create an entry with a name and source.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Classify the loading strategy by source suffix.
    ///
    /// Matching is case-sensitive per the existing convention; there is no
    /// content sniffing.
    pub fn strategy(&self) -> ImageStrategy {
        if self.source.ends_with(".tif") || self.source.ends_with(".tiff") {
            ImageStrategy::Tiled
        } else if self.source.ends_with(".dzi") {
            ImageStrategy::DeepZoom
        } else {
            ImageStrategy::Simple
        }
    }
}

/// How an image source should be loaded by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrategy {
    /// Tile server streaming (`.tif` / `.tiff`).
    Tiled,
    /// Deep-zoom pyramid (`.dzi`).
    DeepZoom,
    /// Single-resource fetch (everything else).
    Simple,
}

/// Editor state carried by the full-project save body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    /// Index of the image currently shown.
    pub active_image_index: usize,

    /// Index of the active workflow step.
    pub active_step: usize,

    /// Index of the active drawing layer.
    pub active_layer_index: usize,

    /// Editor mode identifier.
    #[serde(rename = "type")]
    pub kind: String,

    /// Workflow step definitions, carried through untouched.
    #[serde(default)]
    pub steps: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strategy_by_suffix() {
        assert_eq!(ImageEntry::new("a", "slide.tif").strategy(), ImageStrategy::Tiled);
        assert_eq!(ImageEntry::new("a", "slide.tiff").strategy(), ImageStrategy::Tiled);
        assert_eq!(ImageEntry::new("a", "slide.dzi").strategy(), ImageStrategy::DeepZoom);
        assert_eq!(ImageEntry::new("a", "photo.png").strategy(), ImageStrategy::Simple);
        assert_eq!(ImageEntry::new("a", "no-extension").strategy(), ImageStrategy::Simple);
    }

    #[test]
    fn test_strategy_is_case_sensitive() {
        // Uppercase suffixes fall through to the simple strategy by convention
        assert_eq!(ImageEntry::new("a", "slide.TIF").strategy(), ImageStrategy::Simple);
        assert_eq!(ImageEntry::new("a", "slide.DZI").strategy(), ImageStrategy::Simple);
    }

    #[test]
    fn test_manifest_tolerates_missing_fields() {
        let manifest: ProjectManifest = serde_json::from_value(json!({})).expect("parse");
        assert!(manifest.annotation.is_none());
        assert!(manifest.images.is_empty());
        assert!(manifest.editor.is_none());
    }

    #[test]
    fn test_image_extra_fields_carried_through() {
        let entry: ImageEntry =
            serde_json::from_value(json!({"name": "a", "source": "a.dzi", "opacity": 0.5}))
                .expect("parse");
        let out = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(out["opacity"], 0.5);
    }

    #[test]
    fn test_editor_state_wire_names() {
        let state = EditorState {
            active_image_index: 0,
            active_step: 2,
            active_layer_index: 1,
            kind: "dzi".to_string(),
            steps: vec![json!({"instruction": "review"})],
        };
        let value = serde_json::to_value(&state).expect("serialize");
        assert_eq!(value["activeImageIndex"], 0);
        assert_eq!(value["activeStep"], 2);
        assert_eq!(value["activeLayerIndex"], 1);
        assert_eq!(value["type"], "dzi");
        assert_eq!(value["steps"][0]["instruction"], "review");
    }
}
