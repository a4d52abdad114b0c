//! Annotation data model: layers, committed marks and the style snapshot each
//! mark carries.
//!
//! All coordinates are canvas pixels, origin top-left, in the intrinsic pixel
//! space of the background image.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ── Geometry ────────────────────────────────────────────────────────────────

/// A point in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ── Color ───────────────────────────────────────────────────────────────────

/// Straight (non-premultiplied) RGBA color, written as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_rgba_u8(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Color(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Color {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ── Tools & style ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tool {
    #[default]
    Pen,
    Text,
    Eraser,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Pen, Tool::Text, Tool::Eraser];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Pen => "Pen",
            Tool::Text => "Text",
            Tool::Eraser => "Eraser",
        }
    }

    /// Whether pointer-down starts a freehand stroke with this tool.
    pub fn is_stroke(self) -> bool {
        matches!(self, Tool::Pen | Tool::Eraser)
    }
}

/// Stroke cap shape. Round caps pair with round joins, square caps with miter joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrushShape {
    #[default]
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// Dash intervals in canvas pixels, `None` for a solid line.
    pub fn dash_intervals(self) -> Option<[f32; 2]> {
        match self {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some([15.0, 10.0]),
            LineStyle::Dotted => Some([2.0, 8.0]),
        }
    }
}

/// Style descriptor. The engine owns one live copy and every committed
/// annotation owns its own snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: Color,
    pub line_width: f32,
    pub font_size: f32,
    pub brush_shape: BrushShape,
    pub line_style: LineStyle,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Color::rgb(0xef, 0x44, 0x44),
            line_width: 3.0,
            font_size: 16.0,
            brush_shape: BrushShape::Round,
            line_style: LineStyle::Solid,
        }
    }
}

// ── Layers ──────────────────────────────────────────────────────────────────

/// Opaque layer token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub is_visible: bool,
}

// ── Annotations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationId(pub u64);

/// Tool-specific payload of a committed annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotationKind {
    Pen { points: Vec<Point> },
    Eraser { points: Vec<Point> },
    Text { text: String, position: Point },
}

/// A committed stroke or text mark. Never edited after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub layer_id: LayerId,
    pub kind: AnnotationKind,
    pub style: Style,
}

impl Annotation {
    pub fn tool(&self) -> Tool {
        match self.kind {
            AnnotationKind::Pen { .. } => Tool::Pen,
            AnnotationKind::Eraser { .. } => Tool::Eraser,
            AnnotationKind::Text { .. } => Tool::Text,
        }
    }

    /// Stroke points; empty for text marks.
    pub fn points(&self) -> &[Point] {
        match &self.kind {
            AnnotationKind::Pen { points } | AnnotationKind::Eraser { points } => points,
            AnnotationKind::Text { .. } => &[],
        }
    }

    pub fn text(&self) -> Option<(&str, Point)> {
        match &self.kind {
            AnnotationKind::Text { text, position } => Some((text, *position)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parses_six_and_eight_digit_hex() {
        assert_eq!("#ef4444".parse::<Color>().unwrap(), Color::rgb(0xef, 0x44, 0x44));
        let c: Color = "#22C55E80".parse().unwrap();
        assert_eq!(c.to_rgba_u8(), [0x22, 0xc5, 0x5e, 0x80]);
        assert_eq!(c.to_hex(), "#22c55e80");
    }

    #[test]
    fn test_color_rejects_malformed_hex() {
        for bad in ["ef4444", "#ef44", "#gg4444", "#ef44445", "#éé4444"] {
            assert!(bad.parse::<Color>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_style_serializes_colors_as_hex() {
        let json = serde_json::to_string(&Style::default()).unwrap();
        assert!(json.contains("\"#ef4444\""));
        assert!(json.contains("\"ROUND\""));
        let back: Style = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Style::default());
    }

    #[test]
    fn test_text_annotation_has_no_points() {
        let ann = Annotation {
            id: AnnotationId(1),
            layer_id: LayerId::new("base"),
            kind: AnnotationKind::Text {
                text: "Note".into(),
                position: Point::new(100.0, 50.0),
            },
            style: Style::default(),
        };
        assert_eq!(ann.tool(), Tool::Text);
        assert!(ann.points().is_empty());
        assert_eq!(ann.text(), Some(("Note", Point::new(100.0, 50.0))));
    }

    #[test]
    fn test_line_style_dash_intervals() {
        assert_eq!(LineStyle::Solid.dash_intervals(), None);
        assert_eq!(LineStyle::Dashed.dash_intervals(), Some([15.0, 10.0]));
        assert_eq!(LineStyle::Dotted.dash_intervals(), Some([2.0, 8.0]));
    }
}
