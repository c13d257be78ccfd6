//! Overmark: annotation data model and tiered persistence for an
//! interactive image-annotation editor.
//!
//! Users draw vector shapes (points, lines, polygons) over large tiled
//! images; this crate owns how that drawing state becomes a versioned
//! [`model::AnnotationDocument`], how the document's location is resolved
//! from an image or project path, and how saves and loads degrade across
//! the remote endpoint and the local fallback tier.
//!
//! The rendering canvas, the tile viewer, and the concrete HTTP client are
//! external collaborators behind the [`extract::DrawingSurface`],
//! [`persist::RemoteStore`], and [`persist::FallbackStore`] seams.

pub mod config;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod model;
pub mod persist;
pub mod resolve;
pub mod session;

pub use config::AppConfig;
pub use error::{DocumentError, MetadataError, SaveError, StorageError, TransportError};
pub use extract::{DrawingSurface, ShapeRef};
pub use model::{AnnotationDocument, Feature, FeatureClass, Geometry, Layer};
pub use persist::{
    FallbackStore, LoadOutcome, LoadedProject, Orchestrator, RemoteStore, SaveMode, SaveOutcome,
};
pub use session::{EditingSession, LiveShape};
