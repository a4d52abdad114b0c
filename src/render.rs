//! Retained-mode render pipeline.
//!
//! Every call redraws the whole canvas from the model: clear, background, each
//! visible annotation in creation order, then the live stroke on top. Nothing
//! here mutates engine state, so it is safe to call as often as the host likes.

use image::{Rgba, RgbaImage};
use tiny_skia::{
    ColorU8, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, StrokeDash,
    Transform,
};

use crate::config::EraserConfig;
use crate::error::LoadError;
use crate::layers::LayerStack;
use crate::model::{Annotation, AnnotationKind, BrushShape, Color, Point, Style, Tool};
use crate::text::TextRasterizer;

/// A decoded background. Its natural size fixes the canvas' intrinsic size.
#[derive(Debug, Clone)]
pub struct Background {
    image: RgbaImage,
    pixmap: Pixmap,
}

impl Background {
    pub fn new(image: RgbaImage) -> Result<Self, LoadError> {
        let mut pixmap = blank_pixmap(image.width(), image.height())?;
        premultiply_into(&mut pixmap, &image);
        Ok(Self { image, pixmap })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// The stroke currently being drawn, styled with the live tool and style.
#[derive(Debug, Clone, Copy)]
pub struct LiveStroke<'a> {
    pub tool: Tool,
    pub points: &'a [Point],
    pub style: &'a Style,
}

/// Everything a render pass reads.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub background: &'a Background,
    pub annotations: &'a [Annotation],
    pub layers: &'a LayerStack,
    pub live: Option<LiveStroke<'a>>,
}

#[derive(Debug)]
pub struct Renderer {
    eraser: EraserConfig,
    text: Option<TextRasterizer>,
}

impl Renderer {
    pub fn new(eraser: EraserConfig, text: Option<TextRasterizer>) -> Self {
        if text.is_none() {
            log::warn!("no font available; text marks will not be rasterized");
        }
        Self { eraser, text }
    }

    pub fn render(&self, frame: &Frame<'_>) -> Option<RgbaImage> {
        self.render_pixmap(frame).map(|p| pixmap_to_image(&p))
    }

    pub fn render_pixmap(&self, frame: &Frame<'_>) -> Option<Pixmap> {
        let bg = frame.background;

        // 1. A fresh pixmap starts fully transparent.
        let mut pixmap = Pixmap::new(bg.width(), bg.height())?;

        // 2. The canvas is sized to the background, so the fit is 1:1.
        pixmap.data_mut().copy_from_slice(bg.pixmap.data());

        // 3. + 4.
        let visible = frame.layers.visible_ids();
        for ann in frame
            .annotations
            .iter()
            .filter(|a| visible.contains(&a.layer_id))
        {
            self.draw_annotation(&mut pixmap, ann);
        }

        // 5.
        if let Some(live) = frame.live {
            if !live.points.is_empty() {
                self.draw_path(&mut pixmap, live.points, live.tool, live.style);
            }
        }

        Some(pixmap)
    }

    fn draw_annotation(&self, pixmap: &mut Pixmap, ann: &Annotation) {
        match &ann.kind {
            AnnotationKind::Text { text, position } => {
                if let Some(raster) = &self.text {
                    raster.draw(pixmap, text, *position, ann.style.font_size, ann.style.color);
                }
            }
            AnnotationKind::Pen { points } => {
                self.draw_path(pixmap, points, Tool::Pen, &ann.style);
            }
            AnnotationKind::Eraser { points } => {
                self.draw_path(pixmap, points, Tool::Eraser, &ann.style);
            }
        }
    }

    fn draw_path(&self, pixmap: &mut Pixmap, points: &[Point], tool: Tool, style: &Style) {
        let [first, rest @ ..] = points else {
            return;
        };
        if rest.is_empty() {
            return;
        }

        let mut pb = PathBuilder::new();
        pb.move_to(first.x, first.y);
        for p in rest {
            pb.line_to(p.x, p.y);
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let (color, width) = match tool {
            Tool::Eraser => (self.eraser.color, self.eraser.width),
            _ => (style.color, style.line_width),
        };
        let paint = solid_paint(color);
        let stroke = self.stroke_for(style, width);
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    /// A fresh stroke per path, so dash state never carries into the next draw.
    fn stroke_for(&self, style: &Style, width: f32) -> Stroke {
        let (line_cap, line_join) = match style.brush_shape {
            BrushShape::Round => (LineCap::Round, LineJoin::Round),
            BrushShape::Square => (LineCap::Square, LineJoin::Miter),
        };
        let dash = style
            .line_style
            .dash_intervals()
            .and_then(|[on, off]| StrokeDash::new(vec![on, off], 0.0));
        Stroke {
            width,
            line_cap,
            line_join,
            dash,
            ..Default::default()
        }
    }
}

fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn blank_pixmap(width: u32, height: u32) -> Result<Pixmap, LoadError> {
    if width == 0 || height == 0 {
        return Err(LoadError::Empty);
    }
    Pixmap::new(width, height).ok_or(LoadError::TooLarge { width, height })
}

fn premultiply_into(pixmap: &mut Pixmap, img: &RgbaImage) {
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
}

/// Straight-alpha image to premultiplied pixmap. `None` for an empty image.
pub fn image_to_pixmap(img: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = blank_pixmap(img.width(), img.height()).ok()?;
    premultiply_into(&mut pixmap, img);
    Some(pixmap)
}

pub fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}
