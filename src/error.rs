//! Error types for the fallible boundaries of the engine.
//!
//! Input handlers never fail; only loading a background, reading configuration
//! and exporting the flattened image can.

use std::path::PathBuf;

/// Failure to resolve or decode a background image source.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("remote image sources must be fetched by the host: {0}")]
    Remote(String),

    #[error("malformed data URI: {0}")]
    DataUri(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has zero width or height")]
    Empty,

    #[error("image of {width}x{height} is too large to draw on")]
    TooLarge { width: u32, height: u32 },
}

/// Failure to read or interpret an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid color {0:?}")]
    Color(String),

    #[error("failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },
}

/// Failure to produce the flattened export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("background image has not loaded; nothing to export")]
    NotReady,

    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}
