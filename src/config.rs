//! Process-wide configuration.
//!
//! Read once at startup and immutable thereafter. Three sections: the
//! annotation save/load server, the local application port, and the IIIF
//! tiling server consumed by the image-loading collaborator.

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Annotation save/load endpoint addressing.
    #[serde(default)]
    pub server: ServerConfig,

    /// Local application serving options.
    #[serde(default)]
    pub app: AppSection,

    /// Tiling image server addressing.
    #[serde(default, rename = "IIIF")]
    pub iiif: IiifConfig,
}

impl AppConfig {
    /// Deserialize configuration from JSON, filling omitted sections and
    /// fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Addressing for the annotation save/load endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host.
    #[serde(default = "default_server_hostname")]
    pub hostname: String,

    /// Server port, used for direct local addressing.
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Path prefix under the host; empty means the server root.
    #[serde(default)]
    pub path: String,
}

fn default_server_hostname() -> String {
    "localhost".to_string()
}

fn default_server_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_server_hostname(),
            port: default_server_port(),
            path: String::new(),
        }
    }
}

impl ServerConfig {
    /// Base URL of the save/load endpoint.
    pub fn base_url(&self) -> String {
        if self.path.is_empty() {
            format!("https://{}", self.hostname)
        } else {
            format!("https://{}/{}", self.hostname, self.path)
        }
    }
}

/// Local application serving options; not part of the persistence protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSection {
    /// Port the application itself serves on.
    #[serde(default = "default_app_port")]
    pub port: u16,
}

fn default_app_port() -> u16 {
    3000
}

impl Default for AppSection {
    fn default() -> Self {
        Self { port: default_app_port() }
    }
}

/// Addressing for the IIIF tiling server, consumed by the image-loading
/// collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IiifConfig {
    /// Tile server host.
    #[serde(default = "default_server_hostname")]
    pub hostname: String,

    /// Tile server port.
    #[serde(default = "default_iiif_port")]
    pub port: u16,

    /// Whether the tile server is reached over HTTPS.
    #[serde(default)]
    pub https: bool,
}

fn default_iiif_port() -> u16 {
    8182
}

impl Default for IiifConfig {
    fn default() -> Self {
        Self {
            hostname: default_server_hostname(),
            port: default_iiif_port(),
            https: false,
        }
    }
}

impl IiifConfig {
    /// Base URL of the tile server.
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.hostname, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.hostname, "localhost");
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.app.port, 3000);
        assert_eq!(config.iiif.port, 8182);
        assert!(!config.iiif.https);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = AppConfig::from_json(
            r#"{"server": {"hostname": "annotations.example", "path": "viewer"}}"#,
        )
        .expect("parse");
        assert_eq!(config.server.hostname, "annotations.example");
        assert_eq!(config.server.path, "viewer");
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.app.port, 3000);
    }

    #[test]
    fn test_server_base_url() {
        let mut server = ServerConfig::default();
        assert_eq!(server.base_url(), "https://localhost");

        server.hostname = "annotations.example".to_string();
        server.path = "viewer".to_string();
        assert_eq!(server.base_url(), "https://annotations.example/viewer");
    }

    #[test]
    fn test_iiif_base_url_scheme() {
        let mut iiif = IiifConfig::default();
        assert_eq!(iiif.base_url(), "http://localhost:8182");
        iiif.https = true;
        assert_eq!(iiif.base_url(), "https://localhost:8182");
    }

    #[test]
    fn test_iiif_section_uses_uppercase_key() {
        let config = AppConfig::from_json(r#"{"IIIF": {"hostname": "tiles.example"}}"#)
            .expect("parse");
        assert_eq!(config.iiif.hostname, "tiles.example");
    }
}
