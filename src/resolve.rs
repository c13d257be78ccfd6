//! Project manifest resolution.
//!
//! Given the current image or project path, decide where the annotation
//! document lives and how the referenced images should be loaded. Resolution
//! degrades silently: a manifest that cannot be fetched or that declares no
//! annotation path leaves the suffix-derived default in place.

use serde_json::Value;

use crate::model::{ImageEntry, ProjectManifest};
use crate::persist::RemoteStore;

/// Result of resolving a project or image path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProject {
    /// Where the annotation document lives.
    pub annotation_path: String,

    /// Images to load, in manifest order. Empty in direct-image mode.
    pub images: Vec<ImageEntry>,

    /// Opaque editor configuration for the editor-config collaborator.
    pub editor: Option<Value>,
}

/// Derive the default annotation path from an image path by replacing its
/// final extension with `.json` (appending when there is none).
pub fn default_annotation_path(image_path: &str) -> String {
    match image_path.rfind('.') {
        Some(dot) if !image_path[dot..].contains('/') => {
            format!("{}.json", &image_path[..dot])
        }
        _ => format!("{image_path}.json"),
    }
}

/// Resolve a project or image path against the remote store.
///
/// A path ending in `.json` is treated as a project-manifest reference: the
/// manifest is fetched and, when it declares an `annotation` field, that
/// location overrides the default. Fetch or parse failures keep the default
/// and are only logged.
pub async fn resolve<R: RemoteStore>(remote: &R, path: &str) -> ResolvedProject {
    let mut resolved = ResolvedProject {
        annotation_path: default_annotation_path(path),
        images: Vec::new(),
        editor: None,
    };

    if !path.ends_with(".json") {
        log::debug!("direct image path, annotation at {}", resolved.annotation_path);
        return resolved;
    }

    match remote.get_json(path).await {
        Ok(raw) => match serde_json::from_value::<ProjectManifest>(raw) {
            Ok(manifest) => {
                if let Some(annotation) = manifest.annotation {
                    resolved.annotation_path = annotation;
                } else {
                    log::debug!(
                        "manifest {} has no annotation field, keeping {}",
                        path,
                        resolved.annotation_path
                    );
                }
                resolved.images = manifest.images;
                resolved.editor = manifest.editor;
            }
            Err(e) => {
                log::warn!("manifest {} did not parse, keeping default path: {}", path, e);
            }
        },
        Err(e) => {
            log::warn!("manifest {} could not be fetched, keeping default path: {}", path, e);
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::model::ImageStrategy;
    use serde_json::json;
    use std::collections::HashMap;

    struct FakeRemote {
        documents: HashMap<String, Value>,
    }

    impl FakeRemote {
        fn empty() -> Self {
            Self { documents: HashMap::new() }
        }

        fn with(path: &str, value: Value) -> Self {
            let mut remote = Self::empty();
            remote.documents.insert(path.to_string(), value);
            remote
        }
    }

    impl RemoteStore for FakeRemote {
        async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
            self.documents
                .get(path)
                .cloned()
                .ok_or(TransportError::Status(404))
        }

        async fn post_json(&self, _path: &str, _body: &Value) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_annotation_path() {
        assert_eq!(default_annotation_path("/data/slide1.tif"), "/data/slide1.json");
        assert_eq!(default_annotation_path("/data/slide1.dzi"), "/data/slide1.json");
        assert_eq!(default_annotation_path("/data/noext"), "/data/noext.json");
        // A dot in a directory name is not an extension
        assert_eq!(default_annotation_path("/data.v2/slide"), "/data.v2/slide.json");
    }

    #[tokio::test]
    async fn test_direct_image_path_skips_manifest_fetch() {
        let remote = FakeRemote::empty();
        let resolved = resolve(&remote, "/data/slide1.tif").await;
        assert_eq!(resolved.annotation_path, "/data/slide1.json");
        assert!(resolved.images.is_empty());
        assert!(resolved.editor.is_none());
    }

    #[tokio::test]
    async fn test_manifest_overrides_annotation_path() {
        let remote = FakeRemote::with(
            "/data/case7.json",
            json!({
                "annotation": "/ann/case7-v3.json",
                "images": [{"name": "a", "source": "a.dzi"}]
            }),
        );

        let resolved = resolve(&remote, "/data/case7.json").await;
        assert_eq!(resolved.annotation_path, "/ann/case7-v3.json");
        assert_eq!(resolved.images.len(), 1);
        assert_eq!(resolved.images[0].strategy(), ImageStrategy::DeepZoom);
    }

    #[tokio::test]
    async fn test_manifest_fetch_failure_keeps_default() {
        let remote = FakeRemote::empty();
        let resolved = resolve(&remote, "/data/case7.json").await;
        assert_eq!(resolved.annotation_path, "/data/case7.json");
    }

    #[tokio::test]
    async fn test_manifest_without_annotation_field_keeps_default() {
        let remote = FakeRemote::with(
            "/data/case7.json",
            json!({"images": [{"name": "a", "source": "a.tif"}]}),
        );

        let resolved = resolve(&remote, "/data/case7.json").await;
        assert_eq!(resolved.annotation_path, "/data/case7.json");
        assert_eq!(resolved.images[0].strategy(), ImageStrategy::Tiled);
    }

    #[tokio::test]
    async fn test_editor_blob_forwarded_opaquely() {
        let editor = json!({"activeStep": 3, "custom": {"nested": true}});
        let remote = FakeRemote::with(
            "/data/case7.json",
            json!({"annotation": "/ann/a.json", "editor": editor.clone()}),
        );

        let resolved = resolve(&remote, "/data/case7.json").await;
        assert_eq!(resolved.editor, Some(editor));
    }
}
