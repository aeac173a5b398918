use web_sys::CanvasRenderingContext2d;

use crate::constants::*;

/// Creates a rounded rectangle path without filling or stroking.
pub fn rounded_rect_path(context: &CanvasRenderingContext2d, x: f64, y: f64, width: f64, height: f64, radius: f64) {
    let radius = radius.min(width / 2.0).min(height / 2.0).max(0.0);
    context.begin_path();
    context.move_to(x + radius, y);
    context.line_to(x + width - radius, y);
    context.quadratic_curve_to(x + width, y, x + width, y + radius);
    context.line_to(x + width, y + height - radius);
    context.quadratic_curve_to(x + width, y + height, x + width - radius, y + height);
    context.line_to(x + radius, y + height);
    context.quadratic_curve_to(x, y + height, x, y + height - radius);
    context.line_to(x, y + radius);
    context.quadratic_curve_to(x, y, x + radius, y);
    context.close_path();
}

/// Node frame: title bar plus body, with a drop shadow.  `border` is the
/// selection or run-state color.
pub fn draw_node_frame(
    context: &CanvasRenderingContext2d,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    border: &str,
    border_width: f64,
) {
    let top = y - NODE_TITLE_HEIGHT;
    let full = height + NODE_TITLE_HEIGHT;

    context.save();

    // Shadow for depth
    context.set_shadow_color(SHADOW_COLOR);
    context.set_shadow_blur(8.0);
    context.set_shadow_offset_x(0.0);
    context.set_shadow_offset_y(2.0);

    context.set_fill_style_str(NODE_BODY_COLOR);
    rounded_rect_path(context, x, top, width, full, NODE_CORNER_RADIUS);
    context.fill();

    // Remove shadow for title bar and border
    context.set_shadow_blur(0.0);
    context.set_shadow_offset_y(0.0);

    context.save();
    rounded_rect_path(context, x, top, width, full, NODE_CORNER_RADIUS);
    context.clip();
    context.set_fill_style_str(NODE_TITLE_COLOR);
    context.fill_rect(x, top, width, NODE_TITLE_HEIGHT);
    context.restore();

    context.set_line_width(border_width);
    context.set_stroke_style_str(border);
    rounded_rect_path(context, x, top, width, full, NODE_CORNER_RADIUS);
    context.stroke();

    context.restore();
}

pub fn draw_slot(context: &CanvasRenderingContext2d, x: f64, y: f64, color: &str, connected: bool) {
    context.begin_path();
    let _ = context.arc(x, y, NODE_SLOT_RADIUS, 0.0, 2.0 * std::f64::consts::PI);
    if connected {
        context.set_fill_style_str(color);
        context.fill();
    } else {
        context.set_stroke_style_str(color);
        context.set_line_width(1.5);
        context.stroke();
    }
}

/// Bezier link between two anchors, bowing horizontally like a cable.
pub fn draw_link(context: &CanvasRenderingContext2d, from: [f64; 2], to: [f64; 2], color: &str) {
    let dist = ((to[0] - from[0]).abs() * 0.5).max(40.0);
    context.begin_path();
    context.move_to(from[0], from[1]);
    context.bezier_curve_to(from[0] + dist, from[1], to[0] - dist, to[1], to[0], to[1]);
    context.set_stroke_style_str(color);
    context.set_line_width(2.5);
    context.stroke();
}

pub fn draw_arrow_head(context: &CanvasRenderingContext2d, x: f64, y: f64, size: f64, pointing_left: bool, color: &str) {
    let dir = if pointing_left { -1.0 } else { 1.0 };
    context.begin_path();
    context.move_to(x + dir * size / 2.0, y);
    context.line_to(x - dir * size / 2.0, y - size / 2.0);
    context.line_to(x - dir * size / 2.0, y + size / 2.0);
    context.close_path();
    context.set_fill_style_str(color);
    context.fill();
}
