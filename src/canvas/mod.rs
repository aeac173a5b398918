//! Graph canvas: owned graph model, viewport, pointer interaction and the
//! 2D renderer, exposed to the rest of the app through [`GraphCanvas`].

pub mod dialog;
pub mod interaction;
pub mod layout;
pub mod renderer;
pub mod shapes;

use std::collections::HashMap;

use serde_json::Value;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::constants::{MAX_ZOOM, MIN_ZOOM};
use crate::error::{FrontendError, Result};
use crate::graph::{Graph, GraphNode, NodeId, WidgetValue};
use crate::models::NodeRunState;
use crate::registry::{NodeRegistry, WidgetDescriptor, WidgetKind};
use dialog::PromptRequest;
use interaction::Interaction;

/// The narrow surface the job client and inspector need from the canvas.
pub trait GraphCanvas {
    fn load_graph(&mut self, json: &Value) -> Result<()>;
    fn serialize_graph(&self) -> Value;
    fn selected_node(&self) -> Option<&GraphNode>;
    /// Set or clear a node's run-state overlay.  Returns `false` and does
    /// nothing when the node no longer exists.
    fn set_node_state(&mut self, node_id: NodeId, state: Option<NodeRunState>) -> bool;
    fn clear_node_states(&mut self);
    fn force_redraw(&self);
}

/// Pan/zoom transform: `screen = (world + offset) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset: [f64; 2],
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn to_world(&self, screen: [f64; 2]) -> [f64; 2] {
        [
            screen[0] / self.scale - self.offset[0],
            screen[1] / self.scale - self.offset[1],
        ]
    }

    pub fn to_screen(&self, world: [f64; 2]) -> [f64; 2] {
        [
            (world[0] + self.offset[0]) * self.scale,
            (world[1] + self.offset[1]) * self.scale,
        ]
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset[0] += dx / self.scale;
        self.offset[1] += dy / self.scale;
    }

    /// Zoom by `factor`, keeping the world point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: [f64; 2], factor: f64) {
        let before = self.to_world(screen);
        self.scale = (self.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let after = self.to_world(screen);
        self.offset[0] += after[0] - before[0];
        self.offset[1] += after[1] - before[1];
    }
}

pub struct CanvasSurface {
    pub canvas: HtmlCanvasElement,
    pub context: CanvasRenderingContext2d,
}

pub struct CanvasAdapter {
    pub graph: Graph,
    pub registry: NodeRegistry,
    pub viewport: Viewport,
    pub interaction: Interaction,
    pub node_states: HashMap<NodeId, NodeRunState>,
    surface: Option<CanvasSurface>,
    /// CSS pixel size and device pixel ratio of the surface.
    css_size: (f64, f64),
    dpr: f64,
}

impl Default for CanvasAdapter {
    fn default() -> Self {
        Self::new(NodeRegistry::new())
    }
}

impl CanvasAdapter {
    pub fn new(registry: NodeRegistry) -> Self {
        Self {
            graph: Graph::default(),
            registry,
            viewport: Viewport::default(),
            interaction: Interaction::default(),
            node_states: HashMap::new(),
            surface: None,
            css_size: (0.0, 0.0),
            dpr: 1.0,
        }
    }

    pub fn attach(&mut self, surface: CanvasSurface) {
        self.surface = Some(surface);
    }

    pub fn surface(&self) -> Option<&CanvasSurface> {
        self.surface.as_ref()
    }

    /// Match the backing store to the CSS size times the pixel ratio.
    pub fn resize(&mut self, css_width: f64, css_height: f64, dpr: f64) {
        self.css_size = (css_width, css_height);
        self.dpr = if dpr > 0.0 { dpr } else { 1.0 };
        if let Some(surface) = &self.surface {
            surface.canvas.set_width((css_width * self.dpr).round() as u32);
            surface.canvas.set_height((css_height * self.dpr).round() as u32);
        }
    }

    pub fn css_size(&self) -> (f64, f64) {
        self.css_size
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    /// Drop every node and link.
    pub fn clear(&mut self) {
        self.graph = Graph::default();
        self.node_states.clear();
        self.interaction.selected = None;
        self.interaction.drag = Default::default();
    }

    pub fn widget(&self, node_id: NodeId, index: usize) -> Option<&WidgetDescriptor> {
        let node = self.graph.node(node_id)?;
        self.registry.get(&node.type_id)?.widgets.get(index)
    }

    pub fn widget_value(&self, node_id: NodeId, index: usize) -> Option<WidgetValue> {
        let node = self.graph.node(node_id)?;
        node.widgets_values
            .get(index)
            .cloned()
            .or_else(|| self.widget(node_id, index).map(|w| w.default.clone()))
    }

    /// Run the change hook, store the value and update the bound property.
    /// Returns `Ok(false)` when the node is gone.
    pub fn write_widget(&mut self, node_id: NodeId, index: usize, value: WidgetValue) -> Result<bool> {
        let Some(node) = self.graph.node_mut(node_id) else {
            return Ok(false);
        };
        let widget = self
            .registry
            .get(&node.type_id)
            .and_then(|d| d.widgets.get(index))
            .ok_or_else(|| FrontendError::UnknownWidget {
                type_id: node.type_id.clone(),
                widget: index.to_string(),
            })?;
        let value = widget.apply_change(value);
        if node.widgets_values.len() <= index {
            node.widgets_values.resize(index + 1, widget.default.clone());
        }
        if let Some(prop) = &widget.bound_property {
            node.properties.insert(prop.clone(), value.to_json());
        }
        node.widgets_values[index] = value;
        Ok(true)
    }

    /// Create a node of `type_id` with its title bar at `world`.
    pub fn add_node(&mut self, type_id: &str, world: [f64; 2]) -> Result<NodeId> {
        let node = self.registry.instantiate(type_id, 0, world)?;
        let id = self.graph.add_node(node)?;
        self.interaction.selected = Some(id);
        Ok(id)
    }

    /// Prompt for a widget, placed over the widget's on-screen rectangle.
    /// `origin` is the canvas element's position on the page.
    pub fn prompt_request(&self, node_id: NodeId, index: usize, origin: [f64; 2]) -> Option<PromptRequest> {
        let node = self.graph.node(node_id)?;
        let widgets = &self.registry.get(&node.type_id)?.widgets;
        let widget = widgets.get(index)?;
        let rect = layout::compute_widget_layout(node, widgets).into_iter().nth(index)?;
        let screen = self
            .viewport
            .to_screen([node.pos[0] + rect.x, node.pos[1] + rect.y]);
        let value = self.widget_value(node_id, index)?;
        Some(PromptRequest {
            label: widget.name.clone(),
            value: match value {
                WidgetValue::Number(n) => crate::utils::format_number(n),
                other => other.as_text(),
            },
            multiline: widget.constraints.multiline,
            numeric: widget.kind == WidgetKind::Number,
            at: [origin[0] + screen[0], origin[1] + screen[1]],
        })
    }

    pub fn remove_selected(&mut self) -> Option<NodeId> {
        let id = self.interaction.selected.take()?;
        self.node_states.remove(&id);
        self.graph.remove_node(id).map(|n| n.id)
    }
}

impl GraphCanvas for CanvasAdapter {
    fn load_graph(&mut self, json: &Value) -> Result<()> {
        let mut graph = Graph::from_json(json)?;
        for node in graph.nodes.iter_mut() {
            self.registry.reconcile(node);
        }
        self.graph = graph;
        self.node_states.clear();
        self.interaction.selected = None;
        self.interaction.drag = Default::default();
        Ok(())
    }

    fn serialize_graph(&self) -> Value {
        self.graph.to_json()
    }

    fn selected_node(&self) -> Option<&GraphNode> {
        self.interaction.selected.and_then(|id| self.graph.node(id))
    }

    fn set_node_state(&mut self, node_id: NodeId, state: Option<NodeRunState>) -> bool {
        if self.graph.node(node_id).is_none() {
            return false;
        }
        match state {
            Some(s) => {
                self.node_states.insert(node_id, s);
            }
            None => {
                self.node_states.remove(&node_id);
            }
        }
        true
    }

    fn clear_node_states(&mut self) {
        self.node_states.clear();
    }

    fn force_redraw(&self) {
        if let Some(surface) = &self.surface {
            renderer::draw(surface, self);
        }
    }
}
