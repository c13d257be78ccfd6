//! The versioned annotation document schema.
//!
//! An [`AnnotationDocument`] is the serialized record of everything drawn
//! over one image: an ordered legend of feature classes and an ordered stack
//! of layers, each holding its features in draw order. The document is plain
//! data; all I/O lives in the persistence layer.
//!
//! # Versioning
//!
//! `header.schemaVersion` is a semantic version string, currently `"2.0"`.
//! [`AnnotationDocument::parse`] gates on the major component before trusting
//! any field shapes and is otherwise permissive: unknown fields are carried
//! through untouched and missing `layers`/`classes` default to empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;

/// Schema version written into every new document.
pub const SCHEMA_VERSION: &str = "2.0";

/// Major schema version this build understands.
const SUPPORTED_MAJOR: u32 = 2;

/// Document header with schema version and last-write timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Semantic version string, e.g. `"2.0"`.
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,

    /// Epoch milliseconds of the last serialization.
    pub timestamp: u64,
}

/// A feature class definition (label plus legend metadata).
///
/// Declaration order is the legend order and is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureClass {
    /// Class label features refer to.
    pub label: String,

    /// Display color, if the legend defines one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Any further legend metadata, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl FeatureClass {
    /// Create a class with just a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Geometry of a single feature, tagged by shape kind.
///
/// The wire shape is `{"type": ..., "coordinates": ...}` with coordinates
/// nested per kind: a pair for a point, a sequence of pairs for a line
/// string, a sequence of rings (first ring exterior) for a polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single coordinate pair.
    Point([f64; 2]),
    /// An open sequence of coordinate pairs.
    LineString(Vec<[f64; 2]>),
    /// A sequence of closed rings, each a sequence of coordinate pairs.
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    /// The geometry kind as its wire name.
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    /// Check that the coordinate nesting satisfies the shape invariants.
    ///
    /// Violations are rejected outright rather than truncated or repaired, so
    /// a document never round-trips into a silently different shape.
    pub fn validate(&self) -> Result<(), DocumentError> {
        match self {
            Geometry::Point(_) => Ok(()),
            Geometry::LineString(points) => {
                if points.len() < 2 {
                    return Err(DocumentError::invalid_geometry(format!(
                        "LineString needs at least 2 points, found {}",
                        points.len()
                    )));
                }
                Ok(())
            }
            Geometry::Polygon(rings) => {
                if rings.is_empty() {
                    return Err(DocumentError::invalid_geometry(
                        "Polygon needs at least one ring",
                    ));
                }
                for (i, ring) in rings.iter().enumerate() {
                    if ring.len() < 3 {
                        return Err(DocumentError::invalid_geometry(format!(
                            "Polygon ring {} needs at least 3 points, found {}",
                            i,
                            ring.len()
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

/// One drawn shape with an identity, a class reference, and a geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Identity, unique within the owning layer and stable across edits.
    pub id: String,

    /// Class label, resolved against the document's `classes` legend at
    /// render time. An unknown or absent class is tolerated, not fatal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// The feature's geometry.
    pub geometry: Geometry,
}

/// An ordered grouping of features, one z-order band of the drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Identifier, unique within the document.
    pub id: String,

    /// Features in draw (insertion) order.
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// The versioned record of all drawn layers and features for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    /// Schema version and last-write timestamp.
    pub header: Header,

    /// Class legend in declaration order.
    #[serde(default)]
    pub classes: Vec<FeatureClass>,

    /// Layers in paint order.
    #[serde(default)]
    pub layers: Vec<Layer>,

    /// Unknown top-level fields, preserved across a round trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AnnotationDocument {
    /// Create a fresh empty document: current timestamp, no layers, no
    /// classes. This is what a load falls back to when no prior document
    /// exists.
    pub fn empty() -> Self {
        Self {
            header: Header {
                schema_version: SCHEMA_VERSION.to_string(),
                timestamp: now_ms(),
            },
            classes: Vec::new(),
            layers: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Parse a raw JSON value into a document.
    ///
    /// Fails if the header or its schema version is missing, or if the major
    /// version is not one this build understands. Everything else is
    /// permissive: unknown fields are preserved and missing sequences default
    /// to empty. Feature geometries are shape-checked.
    pub fn parse(raw: Value) -> Result<Self, DocumentError> {
        let version = raw
            .get("header")
            .and_then(|h| h.get("schemaVersion"))
            .and_then(Value::as_str)
            .ok_or(DocumentError::SchemaMissing)?;

        let major: Option<u32> = version.split('.').next().and_then(|m| m.parse().ok());
        if major != Some(SUPPORTED_MAJOR) {
            return Err(DocumentError::SchemaUnsupported {
                found: version.to_string(),
                supported: SUPPORTED_MAJOR,
            });
        }

        let document: Self = serde_json::from_value(raw)?;
        for layer in &document.layers {
            for feature in &layer.features {
                feature.geometry.validate()?;
            }
        }
        Ok(document)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<Value, DocumentError> {
        serde_json::to_value(self).map_err(Into::into)
    }

    /// Refresh the header timestamp. Only the persistence orchestrator calls
    /// this, on the save path.
    pub(crate) fn touch(&mut self) {
        self.header.timestamp = now_ms();
    }

    /// Total feature count across all layers.
    pub fn feature_count(&self) -> usize {
        self.layers.iter().map(|l| l.features.len()).sum()
    }
}

/// Current time as epoch milliseconds.
pub(crate) fn now_ms() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
