//! Mapping from viewport (client) coordinates to canvas pixel coordinates.
//!
//! The canvas has a fixed intrinsic size (the background's natural size) but is
//! shown at whatever size the host lays it out at. Both mouse and touch input
//! funnel through [`CanvasSurface::map`].

use crate::model::Point;

/// Where the canvas currently sits on screen, in viewport units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width * 0.5, self.top + self.height * 0.5)
    }
}

/// A pointer sample as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    Mouse { client_x: f32, client_y: f32 },
    /// Active touch points; only the first is read.
    Touch { touches: Vec<(f32, f32)> },
}

impl PointerInput {
    pub fn mouse(client_x: f32, client_y: f32) -> Self {
        PointerInput::Mouse { client_x, client_y }
    }

    pub fn touch(client_x: f32, client_y: f32) -> Self {
        PointerInput::Touch {
            touches: vec![(client_x, client_y)],
        }
    }

    fn client_position(&self) -> Option<(f32, f32)> {
        match self {
            PointerInput::Mouse { client_x, client_y } => Some((*client_x, *client_y)),
            PointerInput::Touch { touches } => touches.first().copied(),
        }
    }
}

/// A mounted canvas: intrinsic pixel size plus its on-screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSurface {
    pub intrinsic_width: u32,
    pub intrinsic_height: u32,
    pub rendered: ScreenRect,
}

impl CanvasSurface {
    /// A surface rendered at exactly its intrinsic size at the viewport origin.
    pub fn unscaled(width: u32, height: u32) -> Self {
        Self {
            intrinsic_width: width,
            intrinsic_height: height,
            rendered: ScreenRect::new(0.0, 0.0, width as f32, height as f32),
        }
    }

    /// Canvas pixels per viewport unit, per axis.
    pub fn scale(&self) -> Option<(f32, f32)> {
        let r = &self.rendered;
        if r.width <= 0.0 || r.height <= 0.0 || !r.width.is_finite() || !r.height.is_finite() {
            return None;
        }
        Some((
            self.intrinsic_width as f32 / r.width,
            self.intrinsic_height as f32 / r.height,
        ))
    }

    /// Map a pointer sample into canvas pixels. A collapsed rect or a touch
    /// event without touch points maps to the origin.
    pub fn map(&self, input: &PointerInput) -> Point {
        let (Some((sx, sy)), Some((cx, cy))) = (self.scale(), input.client_position()) else {
            return Point::ORIGIN;
        };
        Point::new(
            (cx - self.rendered.left) * sx,
            (cy - self.rendered.top) * sy,
        )
    }

    /// Inverse of [`map`](Self::map), used by hosts to anchor overlays.
    pub fn to_client(&self, p: Point) -> (f32, f32) {
        match self.scale() {
            Some((sx, sy)) => (self.rendered.left + p.x / sx, self.rendered.top + p.y / sy),
            None => (self.rendered.left, self.rendered.top),
        }
    }
}

/// Map against a possibly-unmounted surface.
pub fn map_pointer(surface: Option<&CanvasSurface>, input: &PointerInput) -> Point {
    surface.map_or(Point::ORIGIN, |s| s.map(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(rendered_w: f32, rendered_h: f32) -> CanvasSurface {
        CanvasSurface {
            intrinsic_width: 800,
            intrinsic_height: 600,
            rendered: ScreenRect::new(37.0, 12.0, rendered_w, rendered_h),
        }
    }

    #[test]
    fn test_center_maps_to_center_at_any_ratio() {
        for (w, h) in [(800.0, 600.0), (400.0, 300.0), (1600.0, 1200.0)] {
            let s = surface(w, h);
            let (cx, cy) = s.rendered.center();
            let p = s.map(&PointerInput::mouse(cx, cy));
            assert_eq!(p, Point::new(400.0, 300.0), "ratio {w}x{h}");
        }
    }

    #[test]
    fn test_mouse_and_touch_map_identically() {
        let s = surface(400.0, 300.0);
        let m = s.map(&PointerInput::mouse(137.0, 62.0));
        let t = s.map(&PointerInput::touch(137.0, 62.0));
        assert_eq!(m, t);
        assert_eq!(m, Point::new(200.0, 100.0));
    }

    #[test]
    fn test_only_first_touch_is_read() {
        let s = CanvasSurface::unscaled(100, 100);
        let input = PointerInput::Touch {
            touches: vec![(10.0, 20.0), (90.0, 90.0)],
        };
        assert_eq!(s.map(&input), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_degenerate_inputs_map_to_origin() {
        assert_eq!(map_pointer(None, &PointerInput::mouse(5.0, 5.0)), Point::ORIGIN);
        let collapsed = surface(0.0, 300.0);
        assert_eq!(collapsed.map(&PointerInput::mouse(50.0, 50.0)), Point::ORIGIN);
        let s = surface(400.0, 300.0);
        assert_eq!(s.map(&PointerInput::Touch { touches: vec![] }), Point::ORIGIN);
    }

    #[test]
    fn test_to_client_inverts_map() {
        let s = surface(400.0, 300.0);
        let (x, y) = s.to_client(Point::new(200.0, 100.0));
        assert_eq!((x, y), (137.0, 62.0));
    }
}
