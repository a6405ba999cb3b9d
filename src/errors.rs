//! Error types for scenetrack.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in scenetrack operations.
#[derive(Error, Debug)]
pub enum ScenetrackError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog returned an error status
    #[error("Imagery catalog error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Coordinate outside WGS84 range or unparseable
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Date not in `YYYY-MM-DD` form
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Configuration file or value rejected
    #[error("Invalid configuration: {0}")]
    Config(String),
}
