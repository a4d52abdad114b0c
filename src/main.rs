use std::path::{Path, PathBuf};

use anyhow::Context as _;
use eframe::egui;
use image::RgbaImage;
use scan_annotate::export::SessionHost;
use scan_annotate::{
    AnnotationEngine, BrushShape, Color, EngineConfig, ImageSource, LayerId, LineStyle,
    PaletteEntry, PointerInput, ScreenRect, Tool,
};

// ── Session host ────────────────────────────────────────────────────────────

#[derive(Default)]
struct SessionOutcome {
    saved: Option<String>,
    cancelled: bool,
}

impl SessionHost for SessionOutcome {
    fn on_save(&mut self, flattened_image: String) {
        self.saved = Some(flattened_image);
    }

    fn on_cancel(&mut self) {
        self.cancelled = true;
    }
}

fn annotated_path(image_path: &Path) -> PathBuf {
    image_path.with_file_name(format!(
        "{}_annotated.png",
        image_path
            .file_stem()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("out")
    ))
}

fn to_egui(c: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

fn from_rgb_f32(rgb: [f32; 3]) -> Color {
    let ch = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::rgb(ch(rgb[0]), ch(rgb[1]), ch(rgb[2]))
}

enum LayerAction {
    Add,
    Toggle(LayerId),
    Delete(LayerId),
    Activate(LayerId),
}

// ── App ─────────────────────────────────────────────────────────────────────

struct AnnotateApp {
    image_path: PathBuf,
    config: EngineConfig,
    engine: AnnotationEngine,

    texture: Option<egui::TextureHandle>,
    texture_revision: Option<u64>,

    custom_color: [f32; 3],
    text_input_buf: String,
    /// The text editor was (re)opened this frame; ignore its stale focus loss.
    text_entry_fresh: bool,
    show_layers: bool,
    status: Option<String>,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,
}

impl AnnotateApp {
    fn new(image_path: PathBuf, config: EngineConfig) -> Self {
        let mut engine = AnnotationEngine::new(config.clone());
        let status = match image_path.to_str() {
            Some(source) => engine
                .load_background(source)
                .err()
                .map(|e| format!("Could not load image: {e}")),
            None => Some("Image path is not valid UTF-8".to_string()),
        };
        let [r, g, b, _] = engine.style().color.to_rgba_u8();

        Self {
            image_path,
            config,
            engine,
            texture: None,
            texture_revision: None,
            custom_color: [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0],
            text_input_buf: String::new(),
            text_entry_fresh: false,
            show_layers: false,
            status,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
        }
    }

    fn fresh_engine(&self, background: Option<RgbaImage>) -> AnnotationEngine {
        let mut engine = AnnotationEngine::new(self.config.clone());
        if let Some(bg) = background {
            if let Err(e) = engine.set_background_image(bg) {
                log::warn!("could not restart session: {e}");
            }
        }
        engine
    }

    fn restart(&mut self, engine: AnnotationEngine) -> AnnotationEngine {
        self.texture_revision = None;
        self.text_input_buf.clear();
        std::mem::replace(&mut self.engine, engine)
    }

    /// Bakes the annotations in, writes them next to the source image and
    /// continues on the flattened result.
    fn save(&mut self) {
        if !self.engine.is_ready() {
            return;
        }
        let background = self.engine.background().cloned();
        let placeholder = self.fresh_engine(None);
        let finished = self.restart(placeholder);
        let mut outcome = SessionOutcome::default();
        if let Err(e) = finished.save(&mut outcome) {
            log::error!("export failed: {e}");
            self.status = Some(format!("Export failed: {e}"));
            self.engine = self.fresh_engine(background);
            return;
        }
        let Some(data_uri) = outcome.saved else {
            return;
        };
        match self.write_flattened(&data_uri) {
            Ok((flattened, out_path)) => {
                log::info!("exported to {}", out_path.display());
                self.status = Some(format!("Saved {}", out_path.display()));
                self.engine = self.fresh_engine(Some(flattened));
            }
            Err(e) => {
                log::error!("{e:#}");
                self.status = Some(format!("{e:#}"));
            }
        }
    }

    fn write_flattened(&self, data_uri: &str) -> anyhow::Result<(RgbaImage, PathBuf)> {
        let flattened = ImageSource::parse(data_uri)
            .load()
            .context("flattened image did not decode")?;
        let out_path = annotated_path(&self.image_path);
        flattened
            .save(&out_path)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        Ok((flattened, out_path))
    }

    /// Drops every annotation and starts over on the untouched background.
    fn cancel(&mut self) {
        let background = self.engine.background().cloned();
        let next = self.fresh_engine(background);
        let finished = self.restart(next);
        let mut outcome = SessionOutcome::default();
        finished.cancel(&mut outcome);
        if outcome.cancelled {
            self.status = Some("Annotations discarded".to_string());
        }
    }

    fn sync_texture(&mut self, ctx: &egui::Context) {
        let revision = self.engine.revision();
        if self.texture.is_some() && self.texture_revision == Some(revision) {
            return;
        }
        let Some(frame) = self.engine.render() else {
            return;
        };
        let size = [frame.width() as usize, frame.height() as usize];
        let pixels = frame.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        match &mut self.texture {
            Some(tex) => tex.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("canvas", color_image, egui::TextureOptions::LINEAR));
            }
        }
        self.texture_revision = Some(revision);
    }

    /// The canvas aspect-fit into `canvas_rect`, then zoomed and panned.
    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> Option<egui::Rect> {
        let (w, h) = self.engine.canvas_size()?;
        let (w, h) = (w as f32, h as f32);
        let fit = (canvas_rect.width() / w).min(canvas_rect.height() / h);
        let size = egui::vec2(w, h) * fit * self.zoom;
        Some(egui::Rect::from_center_size(
            canvas_rect.center() + self.pan,
            size,
        ))
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) -> (bool, bool) {
        let mut save = false;
        let mut cancel = false;
        ui.horizontal(|ui| {
            for tool in Tool::ALL {
                if ui
                    .selectable_label(self.engine.tool() == tool, tool.label())
                    .clicked()
                {
                    self.engine.set_tool(tool);
                }
            }
            ui.separator();

            if self.engine.tool() == Tool::Pen {
                let style = self.engine.style().clone();
                for (shape, label) in [(BrushShape::Round, "Round"), (BrushShape::Square, "Square")] {
                    if ui.selectable_label(style.brush_shape == shape, label).clicked() {
                        self.engine.set_brush_shape(shape);
                    }
                }
                ui.separator();
                for (line, label) in [
                    (LineStyle::Solid, "Solid"),
                    (LineStyle::Dashed, "Dashed"),
                    (LineStyle::Dotted, "Dotted"),
                ] {
                    if ui.selectable_label(style.line_style == line, label).clicked() {
                        self.engine.set_line_style(line);
                    }
                }
                ui.separator();
            }

            let palette: Vec<PaletteEntry> = self.engine.palette().to_vec();
            let current = self.engine.style().color;
            for entry in palette {
                let stroke = if entry.color == current {
                    egui::Stroke::new(2.0, egui::Color32::WHITE)
                } else {
                    egui::Stroke::NONE
                };
                let swatch = egui::Button::new("")
                    .fill(to_egui(entry.color))
                    .stroke(stroke)
                    .min_size(egui::vec2(18.0, 18.0));
                if ui.add(swatch).on_hover_text(entry.label.as_str()).clicked() {
                    self.engine.set_color(entry.color);
                }
            }
            if ui.color_edit_button_rgb(&mut self.custom_color).changed() {
                self.engine.set_color(from_rgb_f32(self.custom_color));
            }
            ui.separator();

            ui.label("Size:");
            let (lo, hi) = self.config.line_width_range;
            let mut width = self.engine.style().line_width;
            if ui.add(egui::Slider::new(&mut width, lo..=hi)).changed() {
                self.engine.set_line_width(width);
            }
            if self.engine.tool() == Tool::Text {
                ui.separator();
                ui.label("Font:");
                let (lo, hi) = self.config.font_size_range;
                let mut size = self.engine.style().font_size;
                if ui.add(egui::Slider::new(&mut size, lo..=hi)).changed() {
                    self.engine.set_font_size(size);
                }
            }
            ui.separator();

            let layers_label = format!("Layers ({})", self.engine.layers().len());
            if ui.selectable_label(self.show_layers, layers_label).clicked() {
                self.show_layers = !self.show_layers;
            }
            if ui.button("Cancel").clicked() {
                cancel = true;
            }
            if ui.button("Save").clicked() {
                save = true;
            }
            ui.separator();
            ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
        });
        (save, cancel)
    }

    fn layers_panel(&mut self, ui: &mut egui::Ui) {
        let mut actions = Vec::new();
        ui.horizontal(|ui| {
            ui.strong("Layers");
            if ui.button("+").on_hover_text("Add layer").clicked() {
                actions.push(LayerAction::Add);
            }
        });
        ui.separator();

        let active = self.engine.active_layer().clone();
        for layer in self.engine.layers().iter().rev() {
            ui.horizontal(|ui| {
                let eye = if layer.is_visible { "👁" } else { "–" };
                if ui.button(eye).on_hover_text("Toggle visibility").clicked() {
                    actions.push(LayerAction::Toggle(layer.id.clone()));
                }
                if ui
                    .selectable_label(layer.id == active, layer.name.as_str())
                    .clicked()
                {
                    actions.push(LayerAction::Activate(layer.id.clone()));
                }
                if ui.small_button("🗑").on_hover_text("Delete layer").clicked() {
                    actions.push(LayerAction::Delete(layer.id.clone()));
                }
            });
        }

        for action in actions {
            match action {
                LayerAction::Add => {
                    self.engine.add_layer();
                }
                LayerAction::Toggle(id) => self.engine.toggle_layer_visibility(&id),
                LayerAction::Delete(id) => self.engine.delete_layer(&id),
                LayerAction::Activate(id) => self.engine.set_active_layer(&id),
            }
        }
    }

    fn text_entry(&mut self, ctx: &egui::Context) {
        let (Some(anchor), Some(surface)) =
            (self.engine.pending_text_anchor(), self.engine.surface())
        else {
            return;
        };
        let (x, y) = surface.to_client(anchor);
        let text_area = egui::Area::new(egui::Id::new("text_input"))
            .fixed_pos(egui::pos2(x, y))
            .order(egui::Order::Foreground);
        text_area.show(ctx, |ui| {
            ui.set_max_width(300.0);
            let escape = ui.input(|i| i.key_pressed(egui::Key::Escape));
            let te = ui.add(
                egui::TextEdit::singleline(&mut self.text_input_buf).hint_text("Enter label..."),
            );
            if self.text_entry_fresh {
                self.text_entry_fresh = false;
                te.request_focus();
            } else if te.lost_focus() {
                if escape {
                    self.engine.cancel_text();
                } else {
                    self.engine.submit_text(&self.text_input_buf);
                }
                self.text_input_buf.clear();
            } else {
                te.request_focus();
            }
        });
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, response: &egui::Response, img_rect: egui::Rect) {
        let (pressed, released, moving, pos) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.is_moving(),
                i.pointer.interact_pos(),
            )
        });
        let to_input = |p: egui::Pos2| PointerInput::mouse(p.x, p.y);

        if pressed {
            if let Some(p) = pos.filter(|p| response.hovered() && img_rect.contains(*p)) {
                if self.engine.tool() == Tool::Text {
                    // Clicking elsewhere commits what was typed, then re-anchors.
                    let typed = std::mem::take(&mut self.text_input_buf);
                    if self.engine.pending_text_anchor().is_some() {
                        self.engine.submit_text(&typed);
                    }
                    self.text_entry_fresh = true;
                }
                self.engine.pointer_down(&to_input(p));
            }
        } else if self.engine.is_drawing() {
            match pos {
                Some(p) if img_rect.contains(p) => {
                    if moving {
                        self.engine.pointer_move(&to_input(p));
                    }
                }
                _ => self.engine.pointer_leave(),
            }
        }
        if released {
            self.engine.pointer_up();
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for AnnotateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let save_shortcut = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S));

        // Top toolbar
        let (mut save, cancel) = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| self.toolbar(ui))
            .inner;
        save |= save_shortcut;

        if let Some(status) = &self.status {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.label(status);
            });
        }

        if self.show_layers {
            egui::SidePanel::right("layers")
                .resizable(false)
                .default_width(200.0)
                .show(ctx, |ui| self.layers_panel(ui));
        }

        // Canvas
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            painter.rect_filled(canvas_rect, 0.0, egui::Color32::BLACK);

            let Some(img_rect) = self.image_rect_on_screen(canvas_rect) else {
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No image loaded",
                    egui::FontId::proportional(18.0),
                    egui::Color32::from_gray(160),
                );
                return;
            };
            self.engine.set_rendered_rect(ScreenRect::new(
                img_rect.min.x,
                img_rect.min.y,
                img_rect.width(),
                img_rect.height(),
            ));

            // Handle pan (middle mouse button)
            let middle_down = ctx.input(|i| i.pointer.middle_down());
            if middle_down {
                self.pan += ctx.input(|i| i.pointer.delta());
                self.panning = true;
            } else {
                self.panning = false;
            }

            // Handle zoom (scroll wheel)
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let cursor_rel = cursor - canvas_rect.center() - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }

            if !self.panning {
                self.handle_pointer(ctx, &response, img_rect);
            }

            self.sync_texture(ui.ctx());
            if let Some(tex) = &self.texture {
                painter.image(
                    tex.id(),
                    img_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
        });

        self.text_entry(ctx);

        if cancel {
            self.cancel();
        } else if save {
            self.save();
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────────────

const USAGE: &str = "Usage: scan-annotate [--config <path>] [image]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    image: Option<PathBuf>,
    help: bool,
}

fn parse_args(argv: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut iter = argv.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => args.help = true,
            flag if flag.starts_with('-') => anyhow::bail!("unknown option {flag}\n{USAGE}"),
            _ => args.image = Some(PathBuf::from(arg)),
        }
    }
    Ok(args)
}

fn load_config(explicit: Option<&Path>) -> EngineConfig {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(EngineConfig::default_path) else {
        return EngineConfig::default();
    };
    EngineConfig::load(&path).unwrap_or_else(|e| {
        log::warn!("{e}; using default configuration");
        EngineConfig::default()
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }
    let config = load_config(args.config.as_deref());

    let image_path = match args.image {
        Some(path) => path,
        None => rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "webp", "tif", "tiff"])
            .pick_file()
            .context("no image selected")?,
    };

    let title = format!(
        "scan-annotate - {}",
        image_path
            .file_name()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(AnnotateApp::new(image_path, config)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run eframe: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_config_and_image() {
        let args = parse_args(argv(&["--config", "cfg.json", "scan.png"])).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(args.image, Some(PathBuf::from("scan.png")));
        assert!(!args.help);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = parse_args(argv(&["--foo", "scan.png"])).unwrap_err();
        assert!(err.to_string().contains("--foo"));
        assert!(parse_args(argv(&["-x"])).is_err());
        assert!(parse_args(argv(&["--config"])).is_err());
    }

    #[test]
    fn test_help_flag() {
        assert!(parse_args(argv(&["-h"])).unwrap().help);
        assert_eq!(parse_args(argv(&[])).unwrap(), Args::default());
    }
}
