//! The annotation engine: owns the model, routes input into it and renders it.

use image::RgbaImage;

use crate::config::{EngineConfig, PaletteEntry};
use crate::coords::{map_pointer, CanvasSurface, PointerInput, ScreenRect};
use crate::error::{ExportError, LoadError};
use crate::export::{encode_png_data_uri, SessionHost};
use crate::layers::LayerStack;
use crate::model::{
    Annotation, AnnotationId, AnnotationKind, BrushShape, Color, Layer, LayerId, LineStyle,
    Point, Style, Tool,
};
use crate::render::{Background, Frame, LiveStroke, Renderer};
use crate::session::DrawingSession;
use crate::source::ImageSource;
use crate::text::TextRasterizer;

pub struct AnnotationEngine {
    config: EngineConfig,
    renderer: Renderer,
    background: Option<Background>,
    rendered_rect: Option<ScreenRect>,

    layers: LayerStack,
    annotations: Vec<Annotation>,
    session: DrawingSession,

    tool: Tool,
    style: Style,

    next_annotation: u64,
    revision: u64,
}

impl AnnotationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let text = match &config.font_path {
            Some(path) => TextRasterizer::from_path(path)
                .inspect_err(|e| log::warn!("{e}; falling back to the bundled font"))
                .ok()
                .or_else(TextRasterizer::bundled),
            None => TextRasterizer::bundled(),
        };
        let renderer = Renderer::new(config.eraser, text);
        Self::with_renderer(config, renderer)
    }

    pub fn with_renderer(config: EngineConfig, renderer: Renderer) -> Self {
        let style = config.default_style.clone();
        Self {
            config,
            renderer,
            background: None,
            rendered_rect: None,
            layers: LayerStack::new(),
            annotations: Vec::new(),
            session: DrawingSession::default(),
            tool: Tool::default(),
            style,
            next_annotation: 1,
            revision: 0,
        }
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Increases on every state change that can affect rendered output or
    /// overlays. Hosts re-render when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Background ──────────────────────────────────────────────────────────

    /// Resolves and decodes `source`. On failure the engine stays unrendered.
    pub fn load_background(&mut self, source: &str) -> Result<(), LoadError> {
        let image = ImageSource::parse(source).load().map_err(|e| {
            log::warn!("background failed to load: {e}");
            e
        })?;
        self.set_background_image(image)
    }

    /// Load completion: sizes the canvas to the image's natural size.
    pub fn set_background_image(&mut self, image: RgbaImage) -> Result<(), LoadError> {
        let background = Background::new(image)?;
        log::debug!(
            "background ready at {}x{}",
            background.width(),
            background.height()
        );
        self.background = Some(background);
        self.bump_revision();
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.background.is_some()
    }

    pub fn background(&self) -> Option<&RgbaImage> {
        self.background.as_ref().map(Background::image)
    }

    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        self.background.as_ref().map(|b| (b.width(), b.height()))
    }

    // ── Coordinates ─────────────────────────────────────────────────────────

    /// Where the host currently shows the canvas. Until set, the canvas is
    /// assumed to sit unscaled at the viewport origin.
    pub fn set_rendered_rect(&mut self, rect: ScreenRect) {
        self.rendered_rect = Some(rect);
    }

    pub fn surface(&self) -> Option<CanvasSurface> {
        let (w, h) = self.canvas_size()?;
        Some(match self.rendered_rect {
            Some(rendered) => CanvasSurface {
                intrinsic_width: w,
                intrinsic_height: h,
                rendered,
            },
            None => CanvasSurface::unscaled(w, h),
        })
    }

    pub fn canvas_point(&self, input: &PointerInput) -> Point {
        map_pointer(self.surface().as_ref(), input)
    }

    // ── Pointer input ───────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, input: &PointerInput) {
        if !self.is_ready() {
            return;
        }
        let at = self.canvas_point(input);
        self.session.pointer_down(self.tool, at);
        self.bump_revision();
    }

    pub fn pointer_move(&mut self, input: &PointerInput) {
        if !self.session.is_drawing() {
            return;
        }
        let at = self.canvas_point(input);
        if self.session.pointer_move(at) {
            self.bump_revision();
        }
    }

    pub fn pointer_up(&mut self) {
        self.end_stroke(self.tool);
    }

    /// Same as pointer-up so a stroke never stays open off-canvas.
    pub fn pointer_leave(&mut self) {
        self.end_stroke(self.tool);
    }

    pub fn is_drawing(&self) -> bool {
        self.session.is_drawing()
    }

    pub fn live_points(&self) -> Option<&[Point]> {
        self.session.live_points()
    }

    fn end_stroke(&mut self, tool: Tool) -> Option<AnnotationId> {
        if !self.session.is_drawing() {
            return None;
        }
        self.bump_revision();
        let points = self.session.finish_stroke()?;
        let kind = match tool {
            Tool::Eraser => AnnotationKind::Eraser { points },
            _ => AnnotationKind::Pen { points },
        };
        Some(self.commit(kind))
    }

    fn commit(&mut self, kind: AnnotationKind) -> AnnotationId {
        let id = AnnotationId(self.next_annotation);
        self.next_annotation += 1;
        let annotation = Annotation {
            id,
            layer_id: self.layers.active().clone(),
            kind,
            style: self.style.clone(),
        };
        log::debug!(
            "committed {:?} {:?} on layer {}",
            annotation.tool(),
            id,
            annotation.layer_id
        );
        self.annotations.push(annotation);
        self.bump_revision();
        id
    }

    // ── Text entry ──────────────────────────────────────────────────────────

    pub fn pending_text_anchor(&self) -> Option<Point> {
        self.session.text_anchor()
    }

    /// Commits the pending text entry. Empty text discards it.
    pub fn submit_text(&mut self, text: &str) -> Option<AnnotationId> {
        let anchor = self.session.take_text_anchor()?;
        self.bump_revision();
        if text.is_empty() {
            return None;
        }
        Some(self.commit(AnnotationKind::Text {
            text: text.to_string(),
            position: anchor,
        }))
    }

    pub fn cancel_text(&mut self) {
        if self.session.take_text_anchor().is_some() {
            self.bump_revision();
        }
    }

    // ── Tool & style ────────────────────────────────────────────────────────

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switching tools closes any stroke under the tool it was drawn with and
    /// drops a pending text entry when leaving the text tool.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        self.end_stroke(self.tool);
        if tool != Tool::Text {
            self.cancel_text();
        }
        self.tool = tool;
        self.bump_revision();
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn palette(&self) -> &[PaletteEntry] {
        &self.config.palette
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = Style {
            line_width: self.config.clamp_line_width(style.line_width),
            font_size: self.config.clamp_font_size(style.font_size),
            ..style
        };
        self.bump_revision();
    }

    pub fn set_color(&mut self, color: Color) {
        self.style.color = color;
        self.bump_revision();
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.style.line_width = self.config.clamp_line_width(width);
        self.bump_revision();
    }

    pub fn set_font_size(&mut self, size: f32) {
        self.style.font_size = self.config.clamp_font_size(size);
        self.bump_revision();
    }

    pub fn set_brush_shape(&mut self, shape: BrushShape) {
        self.style.brush_shape = shape;
        self.bump_revision();
    }

    pub fn set_line_style(&mut self, line_style: LineStyle) {
        self.style.line_style = line_style;
        self.bump_revision();
    }

    // ── Layers ──────────────────────────────────────────────────────────────

    pub fn layers(&self) -> &[Layer] {
        self.layers.layers()
    }

    pub fn active_layer(&self) -> &LayerId {
        self.layers.active()
    }

    pub fn add_layer(&mut self) -> LayerId {
        let id = self.layers.add();
        self.bump_revision();
        id
    }

    pub fn toggle_layer_visibility(&mut self, id: &LayerId) {
        if self.layers.toggle_visibility(id) {
            self.bump_revision();
        }
    }

    /// Deletes a layer together with its annotations. The last layer stays.
    pub fn delete_layer(&mut self, id: &LayerId) {
        if !self.layers.remove(id) {
            return;
        }
        let before = self.annotations.len();
        self.annotations.retain(|a| &a.layer_id != id);
        log::debug!(
            "layer {id} took {} annotation(s) with it",
            before - self.annotations.len()
        );
        self.bump_revision();
    }

    pub fn set_active_layer(&mut self, id: &LayerId) {
        if self.layers.set_active(id) {
            self.bump_revision();
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    // ── Rendering & export ──────────────────────────────────────────────────

    fn frame(&self, with_live: bool) -> Option<Frame<'_>> {
        let background = self.background.as_ref()?;
        let live = if with_live {
            self.session.live_points().map(|points| LiveStroke {
                tool: self.tool,
                points,
                style: &self.style,
            })
        } else {
            None
        };
        Some(Frame {
            background,
            annotations: &self.annotations,
            layers: &self.layers,
            live,
        })
    }

    /// The visible canvas, live stroke included. `None` until the background loads.
    pub fn render(&self) -> Option<RgbaImage> {
        self.renderer.render(&self.frame(true)?)
    }

    /// Background plus visible annotations, without the live stroke.
    pub fn render_flattened(&self) -> Option<RgbaImage> {
        self.renderer.render(&self.frame(false)?)
    }

    pub fn export_flattened(&self) -> Result<String, ExportError> {
        let flat = self.render_flattened().ok_or(ExportError::NotReady)?;
        encode_png_data_uri(&flat)
    }

    /// Ends the session by handing the flattened image to the host.
    pub fn save(self, host: &mut impl SessionHost) -> Result<(), ExportError> {
        let flattened = self.export_flattened()?;
        log::debug!(
            "saving {} annotation(s) across {} layer(s)",
            self.annotations.len(),
            self.layers.len()
        );
        host.on_save(flattened);
        Ok(())
    }

    /// Ends the session, discarding every annotation.
    pub fn cancel(self, host: &mut impl SessionHost) {
        log::debug!("discarding {} annotation(s)", self.annotations.len());
        host.on_cancel();
    }
}
