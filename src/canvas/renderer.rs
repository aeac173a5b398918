use web_sys::CanvasRenderingContext2d;

use super::interaction::DragState;
use super::layout::{self, WidgetRect};
use super::{shapes, CanvasAdapter, CanvasSurface};
use crate::constants::*;
use crate::graph::{GraphNode, WidgetValue};
use crate::models::NodeRunState;
use crate::registry::{WidgetDescriptor, WidgetKind};
use crate::utils::truncate_graphemes;

const GRID_SPACING: f64 = 40.0;
// Rough average glyph width of the widget font, for truncation.
const APPROX_CHAR_WIDTH: f64 = 7.0;

pub fn state_color(state: &NodeRunState) -> &'static str {
    match state {
        NodeRunState::Running => STATE_RUNNING_COLOR,
        NodeRunState::Failed => STATE_FAILED_COLOR,
        NodeRunState::Completed => STATE_COMPLETED_COLOR,
        NodeRunState::Other(_) => STATE_OTHER_COLOR,
    }
}

pub fn draw(surface: &CanvasSurface, canvas: &CanvasAdapter) {
    let context = &surface.context;
    let width = surface.canvas.width() as f64;
    let height = surface.canvas.height() as f64;

    // Reset any previous transforms
    let _ = context.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    context.set_fill_style_str(CANVAS_BACKGROUND_COLOR);
    context.fill_rect(0.0, 0.0, width, height);

    context.save();
    let _ = context.scale(canvas.dpr(), canvas.dpr());
    let vp = canvas.viewport;
    let _ = context.scale(vp.scale, vp.scale);
    let _ = context.translate(vp.offset[0], vp.offset[1]);

    let (css_w, css_h) = canvas.css_size();
    draw_grid(context, vp.to_world([0.0, 0.0]), vp.to_world([css_w, css_h]));
    draw_links(context, canvas);
    for node in &canvas.graph.nodes {
        let selected = canvas.interaction.selected == Some(node.id);
        let widgets = canvas
            .registry
            .get(&node.type_id)
            .map(|d| d.widgets.as_slice())
            .unwrap_or(&[]);
        draw_node(context, node, widgets, selected, canvas.node_states.get(&node.id));
    }
    draw_pending_connection(context, canvas);

    context.restore();
}

fn draw_grid(context: &CanvasRenderingContext2d, top_left: [f64; 2], bottom_right: [f64; 2]) {
    context.begin_path();
    let mut x = (top_left[0] / GRID_SPACING).floor() * GRID_SPACING;
    while x < bottom_right[0] {
        context.move_to(x, top_left[1]);
        context.line_to(x, bottom_right[1]);
        x += GRID_SPACING;
    }
    let mut y = (top_left[1] / GRID_SPACING).floor() * GRID_SPACING;
    while y < bottom_right[1] {
        context.move_to(top_left[0], y);
        context.line_to(bottom_right[0], y);
        y += GRID_SPACING;
    }
    context.set_stroke_style_str(CANVAS_GRID_COLOR);
    context.set_line_width(1.0);
    context.stroke();
}

fn draw_links(context: &CanvasRenderingContext2d, canvas: &CanvasAdapter) {
    let graph = &canvas.graph;
    for link in &graph.links {
        let (Some(origin), Some(target)) = (graph.node(link.origin_id), graph.node(link.target_id)) else {
            continue;
        };
        let color = if graph.link_is_compatible(link) {
            type_color(&link.type_tag)
        } else {
            LINK_MISMATCH_COLOR
        };
        shapes::draw_link(
            context,
            layout::output_anchor(origin, link.origin_slot),
            layout::input_anchor(target, link.target_slot),
            color,
        );
    }
}

fn draw_pending_connection(context: &CanvasRenderingContext2d, canvas: &CanvasAdapter) {
    if let DragState::Connection {
        origin_id,
        origin_slot,
        type_tag,
        cursor,
    } = &canvas.interaction.drag
    {
        if let Some(origin) = canvas.graph.node(*origin_id) {
            shapes::draw_link(
                context,
                layout::output_anchor(origin, *origin_slot),
                *cursor,
                type_color(type_tag),
            );
        }
    }
}

pub fn draw_node(
    context: &CanvasRenderingContext2d,
    node: &GraphNode,
    widgets: &[WidgetDescriptor],
    selected: bool,
    state: Option<&NodeRunState>,
) {
    let [x, y] = node.pos;
    let [w, h] = node.size;

    let (border, border_width) = match (state, selected) {
        (Some(s), _) => (state_color(s), 3.0),
        (None, true) => (NODE_BORDER_SELECTED, 2.5),
        (None, false) => (NODE_BORDER_DEFAULT, 1.5),
    };
    shapes::draw_node_frame(context, x, y, w, h, border, border_width);

    context.save();
    context.set_font("13px system-ui, -apple-system, sans-serif");
    context.set_fill_style_str(NODE_TEXT_COLOR);
    context.set_text_baseline("middle");
    context.set_text_align("left");
    let title_chars = ((w - 20.0) / APPROX_CHAR_WIDTH).max(1.0) as usize;
    let _ = context.fill_text(
        &truncate_graphemes(&node.title, title_chars),
        x + 10.0,
        y - NODE_TITLE_HEIGHT / 2.0,
    );

    context.set_font("11px system-ui, -apple-system, sans-serif");
    for (i, input) in node.inputs.iter().enumerate() {
        let [ax, ay] = layout::input_anchor(node, i);
        shapes::draw_slot(context, ax, ay, type_color(&input.type_tag), input.link.is_some());
        context.set_fill_style_str(WIDGET_LABEL_COLOR);
        context.set_text_align("left");
        let _ = context.fill_text(&input.name, ax + 10.0, ay);
    }
    for (i, output) in node.outputs.iter().enumerate() {
        let [ax, ay] = layout::output_anchor(node, i);
        shapes::draw_slot(context, ax, ay, type_color(&output.type_tag), !output.links.is_empty());
        context.set_fill_style_str(WIDGET_LABEL_COLOR);
        context.set_text_align("right");
        let _ = context.fill_text(&output.name, ax - 10.0, ay);
    }

    for rect in layout::compute_widget_layout(node, widgets) {
        let widget = &widgets[rect.index];
        let value = node
            .widgets_values
            .get(rect.index)
            .unwrap_or(&widget.default);
        draw_widget(context, node, &rect, widget, value);
    }
    context.restore();
}

fn draw_widget(
    context: &CanvasRenderingContext2d,
    node: &GraphNode,
    rect: &WidgetRect,
    widget: &WidgetDescriptor,
    value: &WidgetValue,
) {
    let x = node.pos[0] + rect.x;
    let y = node.pos[1] + rect.y;

    context.set_fill_style_str(WIDGET_BG_COLOR);
    shapes::rounded_rect_path(context, x, y, rect.w, rect.h, 4.0);
    context.fill();

    let has_arrows = widget.kind != WidgetKind::Text;
    let inset = if has_arrows { WIDGET_ARROW_WIDTH } else { 6.0 };
    if has_arrows {
        let mid = y + rect.h / 2.0;
        shapes::draw_arrow_head(context, x + WIDGET_ARROW_WIDTH / 2.0, mid, 6.0, true, WIDGET_LABEL_COLOR);
        shapes::draw_arrow_head(
            context,
            x + rect.w - WIDGET_ARROW_WIDTH / 2.0,
            mid,
            6.0,
            false,
            WIDGET_LABEL_COLOR,
        );
    }

    let budget = ((rect.w - 2.0 * inset) / APPROX_CHAR_WIDTH).max(1.0) as usize;
    if widget.constraints.multiline {
        context.set_fill_style_str(WIDGET_TEXT_COLOR);
        context.set_text_align("left");
        context.set_text_baseline("top");
        let _ = context.fill_text(&truncate_graphemes(&value.as_text(), budget), x + inset, y + 4.0);
        context.set_text_baseline("middle");
        return;
    }

    let mid = y + rect.h / 2.0;
    let label_budget = budget / 2;
    context.set_fill_style_str(WIDGET_LABEL_COLOR);
    context.set_text_align("left");
    let _ = context.fill_text(&truncate_graphemes(&widget.name, label_budget), x + inset, mid);
    context.set_fill_style_str(WIDGET_TEXT_COLOR);
    context.set_text_align("right");
    let shown = truncate_graphemes(&value.as_text(), budget.saturating_sub(label_budget).max(1));
    let _ = context.fill_text(&shown, x + rect.w - inset, mid);
}
