//! Glyph rasterization for text marks.

use std::path::Path;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::error::ConfigError;
use crate::model::{Color, Point};

/// Face shipped with egui, used when no font is configured.
const BUNDLED_FACE: &str = "Ubuntu-Light";

/// Coverage below this is left untouched.
const MIN_COVERAGE: f32 = 0.02;

/// Font size per extra pixel of synthetic emboldening.
const EMBOLDEN_STEP: f32 = 16.0;

pub struct TextRasterizer {
    font: FontVec,
    /// Double-strike glyphs horizontally; the bundled face has no bold weight.
    embolden: bool,
}

impl std::fmt::Debug for TextRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRasterizer").finish_non_exhaustive()
    }
}

impl TextRasterizer {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let font_err = |reason: String| ConfigError::Font {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| font_err(e.to_string()))?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| font_err(e.to_string()))?;
        Ok(Self {
            font,
            embolden: false,
        })
    }

    /// egui's default proportional face, emboldened so labels read as bold.
    pub fn bundled() -> Option<Self> {
        Some(Self {
            font: bundled_font()?,
            embolden: true,
        })
    }

    /// Extra horizontal strikes per glyph at `font_size`.
    fn extra_strikes(&self, font_size: f32) -> usize {
        if self.embolden {
            (font_size / EMBOLDEN_STEP).round().max(1.0) as usize
        } else {
            0
        }
    }

    /// Scale at which one em equals `font_size` pixels.
    fn scale_for(&self, font_size: f32) -> PxScale {
        let px = match self.font.units_per_em() {
            Some(upem) if upem > 0.0 => font_size * self.font.height_unscaled() / upem,
            _ => font_size,
        };
        PxScale::from(px)
    }

    /// Draws left-aligned `text` with its baseline starting at `baseline`.
    pub fn draw(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        baseline: Point,
        font_size: f32,
        color: Color,
    ) {
        let scale = self.scale_for(font_size);
        let scaled = self.font.as_scaled(scale);
        let strikes = self.extra_strikes(font_size);
        let (width, height) = (pixmap.width() as i64, pixmap.height() as i64);
        let pixels = pixmap.pixels_mut();

        let mut cx = baseline.x;
        let mut prev = None;
        for ch in text.chars() {
            let gid = scaled.glyph_id(ch);
            if let Some(p) = prev {
                cx += scaled.kern(p, gid);
            }
            for strike in 0..=strikes {
                let at = point(cx + strike as f32, baseline.y);
                let Some(outlined) = self.font.outline_glyph(gid.with_scale_and_position(scale, at))
                else {
                    continue;
                };
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    if coverage < MIN_COVERAGE {
                        return;
                    }
                    let x = bounds.min.x as i64 + gx as i64;
                    let y = bounds.min.y as i64 + gy as i64;
                    if x < 0 || y < 0 || x >= width || y >= height {
                        return;
                    }
                    let idx = (y * width + x) as usize;
                    pixels[idx] = blend_over(pixels[idx], color, coverage.min(1.0));
                });
            }
            cx += scaled.h_advance(gid);
            prev = Some(gid);
        }
    }
}

fn bundled_font() -> Option<FontVec> {
    let defs = egui::FontDefinitions::default();
    let data = defs
        .font_data
        .get(BUNDLED_FACE)
        .or_else(|| defs.font_data.values().next())?;
    FontVec::try_from_vec(data.font.to_vec()).ok()
}

/// Source-over of `color` at `coverage` onto a premultiplied pixel.
fn blend_over(dst: PremultipliedColorU8, color: Color, coverage: f32) -> PremultipliedColorU8 {
    let sa = color.a as f32 / 255.0 * coverage;
    let inv = 1.0 - sa;
    let channel = |s: u8, d: u8| s as f32 * sa + d as f32 * inv;
    let a = (255.0 * sa + dst.alpha() as f32 * inv).round().clamp(0.0, 255.0) as u8;
    let premul = |v: f32| v.round().clamp(0.0, a as f32) as u8;
    let r = premul(channel(color.r, dst.red()));
    let g = premul(channel(color.g, dst.green()));
    let b = premul(channel(color.b, dst.blue()));
    PremultipliedColorU8::from_rgba(r, g, b, a).unwrap_or(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_font_is_available() {
        assert!(TextRasterizer::bundled().is_some());
    }

    #[test]
    fn test_draw_paints_above_baseline() {
        let text = TextRasterizer::bundled().unwrap();
        let mut pixmap = Pixmap::new(200, 100).unwrap();
        text.draw(&mut pixmap, "Note", Point::new(20.0, 60.0), 24.0, Color::WHITE);

        let painted: Vec<(u32, u32)> = (0..100u32)
            .flat_map(|y| (0..200u32).map(move |x| (x, y)))
            .filter(|&(x, y)| pixmap.pixel(x, y).is_some_and(|p| p.alpha() > 0))
            .collect();
        assert!(!painted.is_empty());
        assert!(painted.iter().all(|&(x, y)| x >= 19 && y <= 61));
    }

    fn painted(pixmap: &Pixmap) -> usize {
        pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
    }

    #[test]
    fn test_bundled_face_is_emboldened() {
        let plain = TextRasterizer {
            font: bundled_font().unwrap(),
            embolden: false,
        };
        let bold = TextRasterizer::bundled().unwrap();
        assert_eq!(plain.extra_strikes(16.0), 0);
        assert_eq!(bold.extra_strikes(16.0), 1);
        assert_eq!(bold.extra_strikes(48.0), 3);

        let mut thin = Pixmap::new(200, 100).unwrap();
        let mut thick = Pixmap::new(200, 100).unwrap();
        plain.draw(&mut thin, "Lesion", Point::new(10.0, 60.0), 16.0, Color::WHITE);
        bold.draw(&mut thick, "Lesion", Point::new(10.0, 60.0), 16.0, Color::WHITE);
        assert!(painted(&thick) > painted(&thin));
    }

    #[test]
    fn test_blend_full_coverage_replaces_pixel() {
        let dst = PremultipliedColorU8::from_rgba(10, 20, 30, 255).unwrap();
        let out = blend_over(dst, Color::rgb(200, 100, 50), 1.0);
        assert_eq!((out.red(), out.green(), out.blue(), out.alpha()), (200, 100, 50, 255));
    }
}
