use controller::{MapController, StyledCluster, View, Viewport};
use foundation::math::{MERCATOR_MAX_LAT_DEG, lon_lat_to_mercator};
use layers::symbology::TextAlign;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

const BACKGROUND: &str = "#e8eef1";

pub fn rgba_css(c: [f32; 4]) -> String {
    let r = (c[0].clamp(0.0, 1.0) * 255.0).round() as u32;
    let g = (c[1].clamp(0.0, 1.0) * 255.0).round() as u32;
    let b = (c[2].clamp(0.0, 1.0) * 255.0).round() as u32;
    let a = c[3].clamp(0.0, 1.0);
    format!("rgba({r},{g},{b},{a})")
}

fn ctx_set_fill_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("fillStyle"),
        &JsValue::from_str(value),
    );
}

fn ctx_set_stroke_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("strokeStyle"),
        &JsValue::from_str(value),
    );
}

pub fn draw_map(ctx: &CanvasRenderingContext2d, controller: &mut MapController) {
    let vp = controller.viewport();
    ctx_set_fill_style(ctx, BACKGROUND);
    ctx.fill_rect(0.0, 0.0, vp.width_px, vp.height_px);

    draw_graticule(ctx, controller.view(), vp);
    for styled in controller.styled_clusters() {
        draw_cluster(ctx, &styled);
    }
}

fn line(ctx: &CanvasRenderingContext2d, view: &View, vp: Viewport, a: [f64; 2], b: [f64; 2]) {
    let p0 = view.coordinate_to_pixel(lon_lat_to_mercator(a), vp);
    let p1 = view.coordinate_to_pixel(lon_lat_to_mercator(b), vp);
    ctx.begin_path();
    ctx.move_to(p0[0], p0[1]);
    ctx.line_to(p1[0], p1[1]);
    ctx.stroke();
}

fn draw_graticule(ctx: &CanvasRenderingContext2d, view: &View, vp: Viewport) {
    let max_lat = MERCATOR_MAX_LAT_DEG;

    // Minor lines.
    ctx_set_stroke_style(ctx, "rgba(100,116,139,0.15)");
    ctx.set_line_width(0.75);
    for lon in (-180..=180).step_by(10) {
        line(ctx, view, vp, [lon as f64, -max_lat], [lon as f64, max_lat]);
    }
    for lat in (-80..=80).step_by(10) {
        line(ctx, view, vp, [-180.0, lat as f64], [180.0, lat as f64]);
    }

    // Major lines.
    ctx_set_stroke_style(ctx, "rgba(100,116,139,0.40)");
    ctx.set_line_width(1.25);
    for lon in (-180..=180).step_by(30) {
        line(ctx, view, vp, [lon as f64, -max_lat], [lon as f64, max_lat]);
    }
    for lat in (-60..=60).step_by(30) {
        line(ctx, view, vp, [-180.0, lat as f64], [180.0, lat as f64]);
    }
}

fn draw_cluster(ctx: &CanvasRenderingContext2d, styled: &StyledCluster) {
    let [x, y] = styled.pixel;
    let circle = &styled.style.circle;

    ctx.begin_path();
    let _ = ctx.arc(x, y, circle.radius_px as f64, 0.0, std::f64::consts::TAU);
    ctx_set_fill_style(ctx, &rgba_css(circle.fill));
    ctx.fill();
    ctx_set_stroke_style(ctx, &rgba_css(circle.stroke));
    ctx.set_line_width(circle.stroke_width_px as f64);
    ctx.stroke();

    let text = &styled.style.text;
    let tx = x + text.offset_px[0] as f64;
    let ty = y + text.offset_px[1] as f64;
    ctx.set_font(text.font);
    ctx.set_text_align(match text.align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
    });
    ctx.set_text_baseline("middle");
    if let Some((color, width)) = text.halo {
        ctx_set_stroke_style(ctx, &rgba_css(color));
        ctx.set_line_width(width as f64);
        ctx.set_line_join("round");
        let _ = ctx.stroke_text(&text.text, tx, ty);
    }
    ctx_set_fill_style(ctx, &rgba_css(text.fill));
    let _ = ctx.fill_text(&text.text, tx, ty);
}
