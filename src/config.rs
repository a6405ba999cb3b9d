//! Widget configuration.
//!
//! Built-in defaults, optionally overridden by a TOML file, then by CLI flags.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::ScenetrackError;
use crate::models::Coordinate;
use crate::query::DEFAULT_PADDING_DEG;

/// LandsatLook STAC item search for Collection 2 Level-2 surface reflectance.
pub const DEFAULT_ENDPOINT: &str =
    "https://landsatlook.usgs.gov/sat-api/collections/landsat-c2l2-sr/items";

/// OpenStreetMap raster tiles, Leaflet URL template.
pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Map zoom level on first render.
pub const DEFAULT_ZOOM: u8 = 13;

/// Starting cursor: San Francisco.
pub const DEFAULT_CURSOR: Coordinate = Coordinate {
    latitude: 37.7749,
    longitude: -122.4194,
};

/// Resolved widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub endpoint: String,
    pub tile_url: String,
    pub initial_cursor: Coordinate,
    pub zoom: u8,
    pub bbox_padding: f64,
    pub timeout_secs: u64,
    /// Clear the found scene when a fetch fails instead of keeping the last one.
    pub clear_imagery_on_error: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            tile_url: DEFAULT_TILE_URL.to_string(),
            initial_cursor: DEFAULT_CURSOR,
            zoom: DEFAULT_ZOOM,
            bbox_padding: DEFAULT_PADDING_DEG,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            clear_imagery_on_error: false,
        }
    }
}

/// On-disk form: every field optional.
///
/// Example TOML:
/// ```toml
/// endpoint = "https://landsatlook.usgs.gov/sat-api/collections/landsat-c2l2-sr/items"
/// bbox_padding = 0.5
/// clear_imagery_on_error = true
///
/// [initial_cursor]
/// lat = 40.0
/// lng = -105.0
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub endpoint: Option<String>,
    pub tile_url: Option<String>,
    pub initial_cursor: Option<Coordinate>,
    pub zoom: Option<u8>,
    pub bbox_padding: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub clear_imagery_on_error: Option<bool>,
}

impl ConfigFile {
    /// Read and parse a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ScenetrackError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ScenetrackError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
            .map_err(|e| ScenetrackError::Config(format!("{}: {e}", path.display())))
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

impl WidgetConfig {
    /// Apply the set fields of a config file on top of this config.
    #[must_use]
    pub fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(endpoint) = file.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(tile_url) = file.tile_url {
            self.tile_url = tile_url;
        }
        if let Some(cursor) = file.initial_cursor {
            self.initial_cursor = cursor;
        }
        if let Some(zoom) = file.zoom {
            self.zoom = zoom;
        }
        if let Some(padding) = file.bbox_padding {
            self.bbox_padding = padding;
        }
        if let Some(timeout) = file.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(clear) = file.clear_imagery_on_error {
            self.clear_imagery_on_error = clear;
        }
        self
    }

    /// Load defaults merged with an optional config file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file is unreadable or the result is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ScenetrackError> {
        let config = match path {
            Some(path) => Self::default().merge(ConfigFile::load(path)?),
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the resolved values.
    pub fn validate(&self) -> Result<(), ScenetrackError> {
        if !(self.bbox_padding.is_finite() && self.bbox_padding > 0.0) {
            return Err(ScenetrackError::Config(format!(
                "bbox_padding must be positive, got {}",
                self.bbox_padding
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ScenetrackError::Config("timeout_secs must be positive".into()));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ScenetrackError::Config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        self.initial_cursor
            .validate()
            .map_err(|e| ScenetrackError::Config(format!("initial_cursor: {e}")))
    }
}
