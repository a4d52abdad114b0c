//! Freehand annotation engine for diagnostic images.
//!
//! A retained-mode canvas: layers of committed strokes and text marks over a
//! background image, redrawn from the model on every change and flattened to a
//! PNG on save.

pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod export;
pub mod layers;
pub mod model;
pub mod render;
pub mod session;
pub mod source;
pub mod text;

pub use config::{EngineConfig, EraserConfig, PaletteEntry};
pub use coords::{CanvasSurface, PointerInput, ScreenRect};
pub use engine::AnnotationEngine;
pub use error::{ConfigError, ExportError, LoadError};
pub use export::SessionHost;
pub use model::{
    Annotation, AnnotationId, AnnotationKind, BrushShape, Color, Layer, LayerId, LineStyle,
    Point, Style, Tool,
};
pub use source::ImageSource;
