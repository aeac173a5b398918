//! Widget layout and hit-testing.
//!
//! All coordinates here are node-local: `x = 0` is the node's left edge,
//! `y = 0` the top of its body.  The title bar sits above, at negative `y`.

use crate::constants::*;
use crate::graph::GraphNode;
use crate::registry::{WidgetDescriptor, WidgetKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetRect {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl WidgetRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.w && y >= self.y && y < self.y + self.h
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

/// Which part of a widget was hit.  Only number and combo widgets have
/// arrow zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetZone {
    Decrement,
    Middle,
    Increment,
}

pub fn slot_anchor_y(index: usize) -> f64 {
    (index as f64 + 0.7) * NODE_SLOT_HEIGHT
}

pub fn input_anchor(node: &GraphNode, index: usize) -> [f64; 2] {
    [node.pos[0], node.pos[1] + slot_anchor_y(index)]
}

pub fn output_anchor(node: &GraphNode, index: usize) -> [f64; 2] {
    [node.pos[0] + node.size[0], node.pos[1] + slot_anchor_y(index)]
}

pub fn widget_height(widget: &WidgetDescriptor) -> f64 {
    if widget.kind == WidgetKind::Text && widget.constraints.multiline {
        WIDGET_MULTILINE_HEIGHT
    } else {
        WIDGET_HEIGHT
    }
}

/// Where the widget stack begins: below the lowest port anchor, unless the
/// node declares its own start.
pub fn widgets_start(node: &GraphNode) -> f64 {
    if let Some(start) = node.widgets_start_y {
        return start;
    }
    let slots = node.inputs.len().max(node.outputs.len());
    if slots == 0 {
        WIDGET_GAP
    } else {
        slot_anchor_y(slots - 1) + NODE_SLOT_RADIUS + WIDGET_GAP
    }
}

pub fn compute_widget_layout(node: &GraphNode, widgets: &[WidgetDescriptor]) -> Vec<WidgetRect> {
    let width = (node.size[0] - 2.0 * WIDGET_SIDE_MARGIN).max(0.0);
    let mut y = widgets_start(node);
    widgets
        .iter()
        .enumerate()
        .map(|(index, widget)| {
            let h = widget_height(widget);
            let rect = WidgetRect {
                index,
                x: WIDGET_SIDE_MARGIN,
                y,
                w: width,
                h,
            };
            y += h + WIDGET_GAP;
            rect
        })
        .collect()
}

/// Body height needed to show every widget.
pub fn required_height(node: &GraphNode, widgets: &[WidgetDescriptor]) -> f64 {
    let slots = node.inputs.len().max(node.outputs.len()) as f64 * NODE_SLOT_HEIGHT;
    let stack = compute_widget_layout(node, widgets)
        .last()
        .map(|r| r.bottom() + WIDGET_BOTTOM_PADDING)
        .unwrap_or(0.0);
    slots.max(stack)
}

/// Grow (never shrink) a node so its widgets fit.
pub fn fit_node_to_widgets(node: &mut GraphNode, widgets: &[WidgetDescriptor]) {
    node.size[0] = node.size[0].max(NODE_MIN_WIDTH);
    node.size[1] = node.size[1].max(required_height(node, widgets));
}

pub fn hit_widget(
    node: &GraphNode,
    widgets: &[WidgetDescriptor],
    local_x: f64,
    local_y: f64,
) -> Option<(usize, WidgetZone)> {
    let rect = compute_widget_layout(node, widgets)
        .into_iter()
        .find(|r| r.contains(local_x, local_y))?;
    let zone = match widgets[rect.index].kind {
        WidgetKind::Text => WidgetZone::Middle,
        WidgetKind::Number | WidgetKind::Combo => {
            if local_x < rect.x + WIDGET_ARROW_WIDTH {
                WidgetZone::Decrement
            } else if local_x > rect.x + rect.w - WIDGET_ARROW_WIDTH {
                WidgetZone::Increment
            } else {
                WidgetZone::Middle
            }
        }
    };
    Some((rect.index, zone))
}

fn near(ax: f64, ay: f64, bx: f64, by: f64) -> bool {
    let (dx, dy) = (ax - bx, ay - by);
    dx * dx + dy * dy <= NODE_SLOT_HIT_RADIUS * NODE_SLOT_HIT_RADIUS
}

pub fn hit_input_slot(node: &GraphNode, local_x: f64, local_y: f64) -> Option<usize> {
    (0..node.inputs.len()).find(|i| near(local_x, local_y, 0.0, slot_anchor_y(*i)))
}

pub fn hit_output_slot(node: &GraphNode, local_x: f64, local_y: f64) -> Option<usize> {
    (0..node.outputs.len()).find(|i| near(local_x, local_y, node.size[0], slot_anchor_y(*i)))
}

pub fn hit_title(node: &GraphNode, local_x: f64, local_y: f64) -> bool {
    local_x >= 0.0 && local_x <= node.size[0] && (-NODE_TITLE_HEIGHT..0.0).contains(&local_y)
}
