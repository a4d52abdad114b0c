use image::{Rgba, RgbaImage};
use scan_annotate::{
    AnnotationEngine, BrushShape, Color, EngineConfig, ImageSource, LineStyle, Point,
    PointerInput, ScreenRect, Tool,
};

const BG: [u8; 4] = [20, 30, 40, 255];
const RED: Color = Color::rgb(0xef, 0x44, 0x44);
const GREEN: Color = Color::rgb(0x22, 0xc5, 0x5e);

fn engine() -> AnnotationEngine {
    let mut engine = AnnotationEngine::new(EngineConfig::default());
    engine
        .set_background_image(RgbaImage::from_pixel(240, 120, Rgba(BG)))
        .unwrap();
    engine
}

fn draw(engine: &mut AnnotationEngine, points: &[(f32, f32)]) {
    let (first, rest) = points.split_first().unwrap();
    engine.pointer_down(&PointerInput::mouse(first.0, first.1));
    for p in rest {
        engine.pointer_move(&PointerInput::mouse(p.0, p.1));
    }
    engine.pointer_up();
}

fn flattened(engine: &AnnotationEngine) -> RgbaImage {
    let uri = engine.export_flattened().unwrap();
    ImageSource::parse(&uri).load().unwrap()
}

#[test]
fn test_scenario_a_pen_stroke_snapshot() {
    let mut engine = engine();
    assert_eq!(engine.layers().len(), 1);
    engine.set_color(RED);
    engine.set_line_width(3.0);
    engine.set_brush_shape(BrushShape::Round);
    engine.set_line_style(LineStyle::Solid);
    let expected = engine.style().clone();

    draw(
        &mut engine,
        &[(10.0, 10.0), (20.0, 12.0), (30.0, 14.0), (40.0, 16.0), (50.0, 18.0)],
    );

    let anns = engine.annotations();
    assert_eq!(anns.len(), 1);
    assert_eq!(anns[0].tool(), Tool::Pen);
    assert_eq!(anns[0].points().len(), 5);
    assert_eq!(anns[0].style, expected);
    assert_eq!(&anns[0].layer_id, engine.active_layer());
}

#[test]
fn test_scenario_b_text_routes_to_active_layer() {
    let mut engine = engine();
    let base = engine.active_layer().clone();
    let second = engine.add_layer();
    assert_eq!(engine.layers().len(), 2);
    engine.set_active_layer(&second);

    engine.set_tool(Tool::Text);
    engine.pointer_down(&PointerInput::mouse(100.0, 50.0));
    let id = engine.submit_text("Note").unwrap();

    let ann = engine.annotations().iter().find(|a| a.id == id).unwrap();
    assert_eq!(ann.layer_id, second);
    assert_ne!(ann.layer_id, base);
    assert_eq!(ann.text(), Some(("Note", Point::new(100.0, 50.0))));
    assert!(ann.points().is_empty());
}

#[test]
fn test_scenario_c_hidden_layer_is_not_exported() {
    let mut engine = engine();
    let layer1 = engine.active_layer().clone();
    engine.set_color(RED);
    draw(&mut engine, &[(10.0, 30.5), (230.0, 30.5)]);

    let layer2 = engine.add_layer();
    engine.set_color(GREEN);
    draw(&mut engine, &[(10.0, 90.5), (230.0, 90.5)]);
    assert_eq!(engine.annotations()[1].layer_id, layer2);

    engine.toggle_layer_visibility(&layer1);
    let flat = flattened(&engine);
    assert_eq!(flat.get_pixel(120, 30).0, BG);
    assert_eq!(flat.get_pixel(120, 90).0, GREEN.to_rgba_u8());
    assert_eq!(flat.get_pixel(120, 60).0, BG);
    assert_eq!(engine.annotations().len(), 2);
}

#[test]
fn test_scenario_d_last_layer_survives() {
    let mut engine = engine();
    let base = engine.active_layer().clone();
    let extra = engine.add_layer();
    engine.delete_layer(&base);
    assert_eq!(engine.layers().len(), 1);
    assert_eq!(engine.active_layer(), &extra);

    engine.delete_layer(&extra);
    assert_eq!(engine.layers().len(), 1);
    assert_eq!(engine.active_layer(), &extra);
}

#[test]
fn test_style_change_does_not_touch_committed_strokes() {
    let mut engine = engine();
    engine.set_color(RED);
    draw(&mut engine, &[(10.0, 30.5), (230.0, 30.5)]);
    let before = engine.render().unwrap();

    engine.set_color(GREEN);
    engine.set_line_width(12.0);
    engine.set_line_style(LineStyle::Dotted);
    engine.set_brush_shape(BrushShape::Square);

    assert_eq!(engine.annotations()[0].style.color, RED);
    assert_eq!(engine.render().unwrap(), before);
}

#[test]
fn test_tap_without_moves_commits_nothing() {
    let mut engine = engine();
    engine.pointer_down(&PointerInput::mouse(50.0, 50.0));
    engine.pointer_up();
    assert!(engine.annotations().is_empty());
}

#[test]
fn test_visibility_toggle_restores_render() {
    let mut engine = engine();
    let base = engine.active_layer().clone();
    draw(&mut engine, &[(10.0, 30.5), (230.0, 30.5)]);
    let shown = engine.render().unwrap();

    engine.toggle_layer_visibility(&base);
    assert_eq!(engine.render().unwrap().get_pixel(120, 30).0, BG);
    assert_eq!(engine.annotations().len(), 1);

    engine.toggle_layer_visibility(&base);
    assert_eq!(engine.render().unwrap(), shown);
}

#[test]
fn test_cascade_delete_leaves_no_dangling_layer_ids() {
    let mut engine = engine();
    let base = engine.active_layer().clone();
    draw(&mut engine, &[(10.0, 10.0), (20.0, 20.0)]);
    let doomed = engine.add_layer();
    draw(&mut engine, &[(30.0, 30.0), (40.0, 40.0)]);
    draw(&mut engine, &[(50.0, 50.0), (60.0, 60.0)]);
    assert_eq!(engine.annotations().len(), 3);

    engine.delete_layer(&doomed);
    assert_eq!(engine.annotations().len(), 1);
    for ann in engine.annotations() {
        assert!(engine.layers().iter().any(|l| l.id == ann.layer_id));
    }
    assert_eq!(engine.active_layer(), &base);

    engine.delete_layer(&base);
    assert_eq!(engine.annotations().len(), 1);
}

#[test]
fn test_center_of_rendered_canvas_maps_to_center_pixel() {
    for (w, h) in [(240.0, 120.0), (480.0, 240.0), (120.0, 60.0)] {
        let mut engine = engine();
        engine.set_rendered_rect(ScreenRect::new(15.0, 25.0, w, h));
        let rect = ScreenRect::new(15.0, 25.0, w, h);
        let (cx, cy) = rect.center();
        assert_eq!(
            engine.canvas_point(&PointerInput::mouse(cx, cy)),
            Point::new(120.0, 60.0)
        );
        assert_eq!(
            engine.canvas_point(&PointerInput::touch(cx, cy)),
            Point::new(120.0, 60.0)
        );
    }
}

#[test]
fn test_eraser_overpaints_without_removing_annotations() {
    let mut engine = engine();
    engine.set_color(RED);
    draw(&mut engine, &[(10.0, 60.5), (230.0, 60.5)]);
    engine.set_tool(Tool::Eraser);
    draw(&mut engine, &[(120.0, 5.0), (120.0, 115.0)]);

    assert_eq!(engine.annotations().len(), 2);
    let flat = flattened(&engine);
    assert_eq!(flat.get_pixel(120, 60).0, [0, 0, 0, 255]);
    assert_eq!(flat.get_pixel(30, 60).0, RED.to_rgba_u8());
}

#[test]
fn test_text_is_baked_into_export() {
    let mut engine = engine();
    engine.set_color(Color::WHITE);
    engine.set_font_size(32.0);
    engine.set_tool(Tool::Text);
    engine.pointer_down(&PointerInput::mouse(100.0, 50.0));
    engine.submit_text("Note").unwrap();

    let flat = flattened(&engine);
    let changed = (90..200)
        .flat_map(|x| (10..55).map(move |y| (x, y)))
        .filter(|&(x, y)| flat.get_pixel(x, y).0 != BG)
        .count();
    assert!(changed > 20, "only {changed} pixels changed");
}

#[test]
fn test_flattened_export_matches_render_without_live_stroke() {
    let mut engine = engine();
    draw(&mut engine, &[(10.0, 10.0), (200.0, 100.0)]);
    engine.pointer_down(&PointerInput::mouse(5.0, 100.0));
    engine.pointer_move(&PointerInput::mouse(200.0, 5.0));
    assert!(engine.is_drawing());

    let flat = flattened(&engine);
    let expected = engine.render_flattened().unwrap();
    assert_eq!(flat, expected);
    assert_ne!(engine.render().unwrap(), expected);
    assert_eq!(flat.dimensions(), (240, 120));
}
