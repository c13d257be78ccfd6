//! Physical-scale metadata from image properties sidecars.
//!
//! Deep-zoom tiling emits a `vips-properties.xml` document next to the tile
//! pyramid with a flat key/value property list. The microns-per-pixel scale
//! lives under the `openslide.mpp-x` / `openslide.mpp-y` keys and feeds
//! physical measurement overlays, so an absent or malformed value is
//! surfaced rather than silently defaulted.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::MetadataError;

/// Property key for the horizontal microns-per-pixel scale.
pub const MPP_X_KEY: &str = "openslide.mpp-x";

/// Property key for the vertical microns-per-pixel scale.
pub const MPP_Y_KEY: &str = "openslide.mpp-y";

/// Physical pixel scale in microns per pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScale {
    /// Horizontal scale.
    pub mpp_x: f64,
    /// Vertical scale.
    pub mpp_y: f64,
}

/// Derive the sidecar location from an image source path.
///
/// The tiler strips the four-character extension (`.dzi`) and emits a
/// sibling `<stem>_files/` directory holding the properties document.
pub fn properties_path(source: &str) -> String {
    let stem = source
        .len()
        .checked_sub(4)
        .and_then(|cut| source.get(..cut))
        .unwrap_or(source);
    format!("{stem}_files/vips-properties.xml")
}

/// Extract the pixel scale from a properties document.
pub fn extract_scale(xml: &str) -> Result<PixelScale, MetadataError> {
    let properties = parse_properties(xml)?;
    Ok(PixelScale {
        mpp_x: numeric_property(&properties, MPP_X_KEY)?,
        mpp_y: numeric_property(&properties, MPP_Y_KEY)?,
    })
}

/// Parse the hierarchical property list into flat key/value pairs in
/// document order.
pub fn parse_properties(xml: &str) -> Result<Vec<(String, String)>, MetadataError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut properties = Vec::new();
    let mut current_element = String::new();
    let mut in_property = false;
    let mut name = String::new();
    let mut value = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if current_element == "property" {
                    in_property = true;
                    name.clear();
                    value.clear();
                }
            }
            Event::End(ref e) => {
                let ended = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if ended == "property" {
                    if !name.is_empty() {
                        properties.push((name.clone(), value.clone()));
                    }
                    in_property = false;
                }
                current_element.clear();
            }
            Event::Text(ref e) => {
                if in_property {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_element.as_str() {
                        "name" => name = text,
                        "value" => value = text,
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    log::debug!("parsed {} properties from sidecar", properties.len());
    Ok(properties)
}

/// Look up a property by exact key (first match wins) and parse it as a
/// number.
fn numeric_property(properties: &[(String, String)], key: &str) -> Result<f64, MetadataError> {
    let (_, value) = properties
        .iter()
        .find(|(name, _)| name == key)
        .ok_or_else(|| MetadataError::not_found(key))?;
    value
        .parse()
        .map_err(|_| MetadataError::malformed(key, value))
}
