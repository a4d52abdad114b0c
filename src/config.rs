//! Engine configuration, persisted as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Color, Style};

const CONFIG_DIR: &str = "scan-annotate";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub label: String,
    pub color: Color,
}

impl PaletteEntry {
    fn new(label: &str, color: Color) -> Self {
        Self {
            label: label.to_string(),
            color,
        }
    }
}

/// How eraser strokes are painted. Erasing overpaints; it never removes
/// annotations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EraserConfig {
    pub color: Color,
    pub width: f32,
}

impl Default for EraserConfig {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub palette: Vec<PaletteEntry>,
    pub default_style: Style,
    pub eraser: EraserConfig,
    pub line_width_range: (f32, f32),
    pub font_size_range: (f32, f32),
    /// TTF/OTF used to rasterize text marks, drawn at its own weight, so point
    /// it at a bold face. Unset uses egui's bundled font, synthetically bolded.
    pub font_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            palette: vec![
                PaletteEntry::new("Pathology", Color::rgb(0xef, 0x44, 0x44)),
                PaletteEntry::new("Normal", Color::rgb(0x22, 0xc5, 0x5e)),
                PaletteEntry::new("Measure", Color::rgb(0x3b, 0x82, 0xf6)),
                PaletteEntry::new("Note", Color::rgb(0xea, 0xb3, 0x08)),
                PaletteEntry::new("White", Color::WHITE),
            ],
            default_style: Style::default(),
            eraser: EraserConfig::default(),
            line_width_range: (1.0, 20.0),
            font_size_range: (8.0, 72.0),
            font_path: None,
        }
    }
}

impl EngineConfig {
    /// `<config_dir>/scan-annotate/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(data)?;
        Ok(config.normalized())
    }

    /// Reads a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data).map_err(io_err)
    }

    pub fn clamp_line_width(&self, width: f32) -> f32 {
        clamp_to(width, self.line_width_range)
    }

    pub fn clamp_font_size(&self, size: f32) -> f32 {
        clamp_to(size, self.font_size_range)
    }

    /// Orders inverted ranges and pulls the default style into range.
    fn normalized(mut self) -> Self {
        for range in [&mut self.line_width_range, &mut self.font_size_range] {
            if range.0 > range.1 {
                *range = (range.1, range.0);
            }
        }
        self.default_style.line_width = self.clamp_line_width(self.default_style.line_width);
        self.default_style.font_size = self.clamp_font_size(self.default_style.font_size);
        self
    }
}

fn clamp_to(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_yields_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.palette.len(), 5);
        assert_eq!(config.eraser.width, 30.0);
    }

    #[test]
    fn test_partial_config_overrides_fields() {
        let config = EngineConfig::from_json(
            r##"{ "eraser": { "color": "#ffffff", "width": 12 }, "line_width_range": [20, 2] }"##,
        )
        .unwrap();
        assert_eq!(config.eraser.color, Color::WHITE);
        assert_eq!(config.eraser.width, 12.0);
        assert_eq!(config.line_width_range, (2.0, 20.0));
        assert_eq!(config.clamp_line_width(40.0), 20.0);
        assert_eq!(config.clamp_line_width(0.0), 2.0);
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "eraser": { "color": "black", "width": 1 } }"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("scan-annotate-missing-config.json");
        let _ = std::fs::remove_file(&path);
        assert_eq!(EngineConfig::load(&path).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("scan-annotate-cfg-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);
        let mut config = EngineConfig::default();
        config.eraser.width = 18.0;
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
