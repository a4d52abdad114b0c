//! Resolving a background image source string into pixels.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;

use crate::error::LoadError;

/// Where a background comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// `data:<mime>[;base64],<payload>`
    DataUri {
        mime: String,
        base64: bool,
        payload: String,
    },
    File(PathBuf),
    /// `http(s)://`; fetching is the host's job.
    Remote(String),
}

impl ImageSource {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if let Some(rest) = trimmed.strip_prefix("data:") {
            let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
            return ImageSource::DataUri {
                mime: header.split(';').next().unwrap_or_default().to_string(),
                base64: header.ends_with(";base64"),
                payload: payload.to_string(),
            };
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return ImageSource::Remote(trimmed.to_string());
        }
        let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        ImageSource::File(PathBuf::from(path))
    }

    /// Decodes the source to RGBA8.
    pub fn load(&self) -> Result<RgbaImage, LoadError> {
        let decoded = match self {
            ImageSource::DataUri {
                base64, payload, ..
            } => {
                if !base64 {
                    return Err(LoadError::DataUri("payload is not base64".into()));
                }
                if payload.is_empty() {
                    return Err(LoadError::DataUri("empty payload".into()));
                }
                let bytes = STANDARD.decode(payload.as_bytes())?;
                image::load_from_memory(&bytes)?
            }
            ImageSource::File(path) => {
                let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                image::load_from_memory(&bytes)?
            }
            ImageSource::Remote(url) => return Err(LoadError::Remote(url.clone())),
        };
        let rgba = decoded.to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(LoadError::Empty);
        }
        Ok(rgba)
    }
}
