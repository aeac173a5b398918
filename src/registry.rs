//! Node type registry.
//!
//! Declares the fixed image-generation catalog once at startup.  After
//! that the descriptors are read-only, except for combo value lists that
//! checkpoint discovery replaces via [`NodeRegistry::update_widget_values`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{FrontendError, Result};
use crate::graph::{Graph, GraphNode, InputSlot, NodeId, OutputSlot, WidgetValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Combo,
    Text,
    Number,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetConstraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub values: Vec<String>,
    pub multiline: bool,
}

/// Change hook run on every new widget value before it is stored.
pub type WidgetHook = fn(&WidgetDescriptor, WidgetValue) -> WidgetValue;

#[derive(Debug, Clone)]
pub struct WidgetDescriptor {
    pub kind: WidgetKind,
    pub name: String,
    pub default: WidgetValue,
    pub bound_property: Option<String>,
    pub constraints: WidgetConstraints,
    pub on_change: Option<WidgetHook>,
}

impl WidgetDescriptor {
    pub fn combo(name: &str, default: &str, values: &[&str]) -> Self {
        Self {
            kind: WidgetKind::Combo,
            name: name.to_string(),
            default: WidgetValue::from(default),
            bound_property: None,
            constraints: WidgetConstraints {
                values: values.iter().map(|v| v.to_string()).collect(),
                ..Default::default()
            },
            on_change: None,
        }
    }

    pub fn text(name: &str, default: &str) -> Self {
        Self {
            kind: WidgetKind::Text,
            name: name.to_string(),
            default: WidgetValue::from(default),
            bound_property: None,
            constraints: WidgetConstraints::default(),
            on_change: None,
        }
    }

    pub fn number(name: &str, default: f64, min: f64, max: f64, step: f64) -> Self {
        Self {
            kind: WidgetKind::Number,
            name: name.to_string(),
            default: WidgetValue::Number(default),
            bound_property: None,
            constraints: WidgetConstraints {
                min: Some(min),
                max: Some(max),
                step: Some(step),
                ..Default::default()
            },
            on_change: Some(snap_to_constraints),
        }
    }

    pub fn multiline(mut self) -> Self {
        self.constraints.multiline = true;
        self
    }

    pub fn bound_to(mut self, property: &str) -> Self {
        self.bound_property = Some(property.to_string());
        self
    }

    /// Whether `value` satisfies this widget's constraints.
    pub fn accepts(&self, value: &WidgetValue) -> bool {
        match self.kind {
            WidgetKind::Number => match value {
                WidgetValue::Number(n) => {
                    n.is_finite()
                        && self.constraints.min.map_or(true, |min| *n >= min)
                        && self.constraints.max.map_or(true, |max| *n <= max)
                }
                _ => false,
            },
            WidgetKind::Combo => match value {
                WidgetValue::Text(s) => self.constraints.values.iter().any(|v| v == s),
                _ => false,
            },
            WidgetKind::Text => matches!(value, WidgetValue::Text(_)),
        }
    }

    /// Parse raw user input into a value of this widget's kind.
    pub fn parse(&self, raw: &str) -> Result<WidgetValue> {
        match self.kind {
            WidgetKind::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(WidgetValue::Number)
                .ok_or_else(|| FrontendError::InvalidWidgetValue {
                    widget: self.name.clone(),
                    raw: raw.to_string(),
                }),
            WidgetKind::Combo | WidgetKind::Text => Ok(WidgetValue::Text(raw.to_string())),
        }
    }

    /// Run the change hook, if any.
    pub fn apply_change(&self, value: WidgetValue) -> WidgetValue {
        match self.on_change {
            Some(hook) => hook(self, value),
            None => value,
        }
    }

    /// Step a number widget by `direction` steps, clamped.
    pub fn step_value(&self, current: &WidgetValue, direction: f64) -> WidgetValue {
        let step = self.constraints.step.unwrap_or(1.0);
        let base = current.as_f64().unwrap_or(0.0);
        self.apply_change(WidgetValue::Number(base + step * direction))
    }

    /// Next (or previous) entry of a combo list, wrapping around.
    pub fn cycle_value(&self, current: &WidgetValue, forward: bool) -> WidgetValue {
        let values = &self.constraints.values;
        if values.is_empty() {
            return current.clone();
        }
        let current = current.as_text();
        let next = match values.iter().position(|v| *v == current) {
            Some(idx) if forward => (idx + 1) % values.len(),
            Some(idx) => (idx + values.len() - 1) % values.len(),
            None => 0,
        };
        WidgetValue::Text(values[next].clone())
    }
}

/// Clamp a number into `[min, max]` and snap it onto the `step` grid
/// anchored at `min`.
pub fn snap_to_constraints(widget: &WidgetDescriptor, value: WidgetValue) -> WidgetValue {
    let c = &widget.constraints;
    match value {
        WidgetValue::Number(n) if n.is_finite() => {
            let mut v = n;
            if let Some(step) = c.step.filter(|s| *s > 0.0) {
                let origin = c.min.unwrap_or(0.0);
                v = origin + ((v - origin) / step).round() * step;
            }
            if let Some(min) = c.min {
                v = v.max(min);
            }
            if let Some(max) = c.max {
                v = v.min(max);
            }
            // Keep 0.05 steps from turning into 0.35000000000000003.
            WidgetValue::Number((v * 1e6).round() / 1e6)
        }
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortDescriptor {
    pub name: String,
    pub type_tag: String,
}

#[derive(Debug, Clone)]
pub struct NodeTypeDescriptor {
    pub type_id: String,
    pub title: String,
    pub category: String,
    pub inputs: Vec<PortDescriptor>,
    pub outputs: Vec<PortDescriptor>,
    pub widgets: Vec<WidgetDescriptor>,
    pub size: [f64; 2],
}

impl NodeTypeDescriptor {
    fn new(type_id: &str, title: &str, category: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            widgets: Vec::new(),
            size: [crate::constants::NODE_MIN_WIDTH, 60.0],
        }
    }

    fn input(mut self, name: &str, type_tag: &str) -> Self {
        self.inputs.push(PortDescriptor {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
        });
        self
    }

    fn output(mut self, name: &str, type_tag: &str) -> Self {
        self.outputs.push(PortDescriptor {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
        });
        self
    }

    fn widget(mut self, widget: WidgetDescriptor) -> Self {
        self.widgets.push(widget);
        self
    }

    fn size(mut self, w: f64, h: f64) -> Self {
        self.size = [w, h];
        self
    }

    pub fn widget_index(&self, name: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.name == name)
    }

    /// Properties a fresh node starts with: each bound widget's default.
    pub fn default_properties(&self) -> Map<String, Value> {
        self.widgets
            .iter()
            .filter_map(|w| {
                w.bound_property
                    .as_ref()
                    .map(|p| (p.clone(), w.default.to_json()))
            })
            .collect()
    }
}

fn catalog() -> Vec<NodeTypeDescriptor> {
    vec![
        NodeTypeDescriptor::new("CheckpointLoaderSimple", "Checkpoint Loader", "loaders")
            .output("MODEL", "MODEL")
            .output("CLIP", "CLIP")
            .output("VAE", "VAE")
            .widget(WidgetDescriptor::combo(
                "ckpt_name",
                "novaRealityXL_ilV90.safetensors",
                &["novaRealityXL_ilV90.safetensors"],
            ))
            .size(260.0, 110.0),
        NodeTypeDescriptor::new("CLIPTextEncode", "CLIP Text Encode", "conditioning")
            .input("clip", "CLIP")
            .output("CONDITIONING", "CONDITIONING")
            .widget(
                WidgetDescriptor::text("text", "a portrait photo, cinematic lighting").multiline(),
            )
            .size(320.0, 160.0),
        NodeTypeDescriptor::new("EmptyLatentImage", "Empty Latent", "latent")
            .output("LATENT", "LATENT")
            .widget(WidgetDescriptor::number("width", 512.0, 64.0, 2048.0, 64.0))
            .widget(WidgetDescriptor::number("height", 512.0, 64.0, 2048.0, 64.0))
            .widget(WidgetDescriptor::number("batch", 1.0, 1.0, 8.0, 1.0))
            .size(220.0, 150.0),
        NodeTypeDescriptor::new("KSampler", "KSampler", "sampling")
            .input("model", "MODEL")
            .input("positive", "CONDITIONING")
            .input("negative", "CONDITIONING")
            .input("latent_image", "LATENT")
            .output("LATENT", "LATENT")
            .widget(WidgetDescriptor::number("seed", 0.0, 0.0, 4_294_967_295.0, 1.0))
            .widget(WidgetDescriptor::number("steps", 20.0, 1.0, 100.0, 1.0))
            .widget(WidgetDescriptor::number("cfg", 8.0, 1.0, 15.0, 0.5))
            .widget(WidgetDescriptor::combo(
                "sampler",
                "euler",
                &["euler", "euler_a", "ddim", "heun"],
            ))
            .widget(WidgetDescriptor::combo(
                "scheduler",
                "normal",
                &["normal", "karras", "exponential"],
            ))
            .widget(WidgetDescriptor::number("denoise", 1.0, 0.0, 1.0, 0.05))
            .size(320.0, 240.0),
        NodeTypeDescriptor::new("VAEDecode", "VAE Decode", "latent")
            .input("samples", "LATENT")
            .input("vae", "VAE")
            .output("IMAGE", "IMAGE")
            .size(220.0, 110.0),
        NodeTypeDescriptor::new("SaveImage", "Save Image", "image")
            .input("images", "IMAGE")
            .widget(WidgetDescriptor::text("prefix", "ComfyUI").bound_to("filename_prefix"))
            .size(220.0, 110.0),
    ]
}

#[derive(Debug, Default)]
pub struct NodeRegistry {
    types: BTreeMap<String, NodeTypeDescriptor>,
    registered: bool,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the fixed catalog.  Returns `false` when it already ran.
    pub fn register_all(&mut self) -> bool {
        if self.registered {
            return false;
        }
        for desc in catalog() {
            self.types.insert(desc.type_id.clone(), desc);
        }
        self.registered = true;
        true
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn get(&self, type_id: &str) -> Option<&NodeTypeDescriptor> {
        self.types.get(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Descriptors ordered by category, then title.
    pub fn types_sorted(&self) -> Vec<&NodeTypeDescriptor> {
        let mut out: Vec<&NodeTypeDescriptor> = self.types.values().collect();
        out.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.title.cmp(&b.title)));
        out
    }

    /// Replace the value list of a combo widget and repair every node in
    /// `graph` whose current value is no longer listed.  Returns the ids of
    /// the nodes that were reset.
    pub fn update_widget_values(
        &mut self,
        type_id: &str,
        widget: &str,
        values: Vec<String>,
        graph: Option<&mut Graph>,
    ) -> Result<Vec<NodeId>> {
        if values.is_empty() {
            return Err(FrontendError::EmptyValueList(format!("{}.{}", type_id, widget)));
        }
        let desc = self
            .types
            .get_mut(type_id)
            .ok_or_else(|| FrontendError::UnknownNodeType(type_id.to_string()))?;
        let idx = desc
            .widget_index(widget)
            .ok_or_else(|| FrontendError::UnknownWidget {
                type_id: type_id.to_string(),
                widget: widget.to_string(),
            })?;

        let w = &mut desc.widgets[idx];
        w.constraints.values = values;
        if !w.accepts(&w.default) {
            w.default = WidgetValue::Text(w.constraints.values[0].clone());
        }

        let mut reset = Vec::new();
        if let Some(graph) = graph {
            let w = &desc.widgets[idx];
            for node in graph.nodes.iter_mut().filter(|n| n.type_id == type_id) {
                let stale = node.widgets_values.get(idx).map_or(true, |v| !w.accepts(v));
                if stale {
                    if node.widgets_values.len() <= idx {
                        node.widgets_values.resize(idx + 1, w.default.clone());
                    }
                    node.widgets_values[idx] = w.default.clone();
                    reset.push(node.id);
                }
            }
        }
        Ok(reset)
    }

    /// Build a fresh node of `type_id` carrying default widget values.
    pub fn instantiate(&self, type_id: &str, id: NodeId, pos: [f64; 2]) -> Result<GraphNode> {
        let desc = self
            .get(type_id)
            .ok_or_else(|| FrontendError::UnknownNodeType(type_id.to_string()))?;
        let mut node = GraphNode {
            id,
            type_id: desc.type_id.clone(),
            title: desc.title.clone(),
            pos,
            size: desc.size,
            inputs: desc
                .inputs
                .iter()
                .map(|p| InputSlot::new(&p.name, &p.type_tag))
                .collect(),
            outputs: desc
                .outputs
                .iter()
                .map(|p| OutputSlot::new(&p.name, &p.type_tag))
                .collect(),
            properties: desc.default_properties(),
            widgets_values: desc.widgets.iter().map(|w| w.default.clone()).collect(),
            widgets_start_y: None,
            extra: Map::new(),
        };
        crate::canvas::layout::fit_node_to_widgets(&mut node, &desc.widgets);
        Ok(node)
    }

    /// Fill in what a loaded node is missing: slot definitions for known
    /// types, default widget values, a title.  Unknown types are left as-is.
    pub fn reconcile(&self, node: &mut GraphNode) {
        let Some(desc) = self.get(&node.type_id) else {
            return;
        };
        if node.title.is_empty() {
            node.title = desc.title.clone();
        }
        if node.inputs.is_empty() {
            node.inputs = desc
                .inputs
                .iter()
                .map(|p| InputSlot::new(&p.name, &p.type_tag))
                .collect();
        }
        if node.outputs.is_empty() {
            node.outputs = desc
                .outputs
                .iter()
                .map(|p| OutputSlot::new(&p.name, &p.type_tag))
                .collect();
        }
        for (i, w) in desc.widgets.iter().enumerate() {
            if node.widgets_values.len() <= i {
                node.widgets_values.push(w.default.clone());
            }
        }
        crate::canvas::layout::fit_node_to_widgets(node, &desc.widgets);
    }
}
