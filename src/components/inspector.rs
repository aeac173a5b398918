//! Inspector panel: one form control per widget of the selected node.
//!
//! Rendering always rebuilds the panel from state, so calling it twice with
//! the same selection yields the same DOM.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

use crate::canvas::GraphCanvas;
use crate::constants::INSPECTOR_ID;
use crate::graph::{GraphNode, NodeId, WidgetValue};
use crate::messages::Message;
use crate::registry::{NodeRegistry, WidgetKind};
use crate::state::{dispatch_global_message, AppState};
use crate::utils::format_number;

pub const PLACEHOLDER: &str = "Select a node to edit its widgets";

#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Select { options: Vec<String> },
    TextArea,
    TextInput,
    NumberInput {
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub widget_index: usize,
    pub label: String,
    pub kind: ControlKind,
    pub value: String,
}

/// Controls for `node`, in widget order.  Unknown node types get none.
pub fn controls_for(node: &GraphNode, registry: &NodeRegistry) -> Vec<ControlSpec> {
    let Some(desc) = registry.get(&node.type_id) else {
        return Vec::new();
    };
    desc.widgets
        .iter()
        .enumerate()
        .map(|(index, widget)| {
            let current = node
                .widgets_values
                .get(index)
                .cloned()
                .unwrap_or_else(|| widget.default.clone());
            let c = &widget.constraints;
            let (kind, value) = match widget.kind {
                WidgetKind::Combo => (
                    ControlKind::Select {
                        options: c.values.clone(),
                    },
                    current.as_text(),
                ),
                WidgetKind::Text if c.multiline => (ControlKind::TextArea, current.as_text()),
                WidgetKind::Text => (ControlKind::TextInput, current.as_text()),
                WidgetKind::Number => (
                    ControlKind::NumberInput {
                        min: c.min,
                        max: c.max,
                        step: c.step,
                    },
                    match &current {
                        WidgetValue::Number(n) => format_number(*n),
                        other => other.as_text(),
                    },
                ),
            };
            ControlSpec {
                widget_index: index,
                label: widget.name.clone(),
                kind,
                value,
            }
        })
        .collect()
}

/// Owned copy of what the panel shows, so the DOM can be rebuilt without
/// holding a borrow of the state.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorView {
    pub node_id: NodeId,
    pub heading: String,
    pub controls: Vec<ControlSpec>,
}

pub fn snapshot(state: &AppState) -> Option<InspectorView> {
    let node = state.canvas.selected_node()?;
    Some(InspectorView {
        node_id: node.id,
        heading: format!("{} #{}", node.title, node.id),
        controls: controls_for(node, &state.canvas.registry),
    })
}

pub fn render(document: &Document, view: Option<&InspectorView>) -> Result<(), JsValue> {
    let Some(panel) = document.get_element_by_id(INSPECTOR_ID) else {
        return Ok(());
    };
    panel.set_inner_html("");

    let Some(view) = view else {
        let empty = document.create_element("p")?;
        empty.set_class_name("inspector-empty");
        empty.set_text_content(Some(PLACEHOLDER));
        panel.append_child(&empty)?;
        return Ok(());
    };

    let heading = document.create_element("h3")?;
    heading.set_text_content(Some(&view.heading));
    panel.append_child(&heading)?;

    for spec in &view.controls {
        let row = document.create_element("label")?;
        row.set_class_name("inspector-row");
        let name = document.create_element("span")?;
        name.set_text_content(Some(&spec.label));
        row.append_child(&name)?;

        let control = build_control(document, spec)?;
        control.set_attribute("data-node", &view.node_id.to_string())?;
        row.append_child(&control)?;
        panel.append_child(&row)?;
    }
    Ok(())
}

fn build_control(document: &Document, spec: &ControlSpec) -> Result<Element, JsValue> {
    let el = match &spec.kind {
        ControlKind::Select { options } => {
            let select = document.create_element("select")?;
            for option in options {
                let opt = document.create_element("option")?;
                opt.set_attribute("value", option)?;
                opt.set_text_content(Some(option));
                if *option == spec.value {
                    opt.set_attribute("selected", "")?;
                }
                select.append_child(&opt)?;
            }
            if let Some(select) = select.dyn_ref::<HtmlSelectElement>() {
                select.set_value(&spec.value);
            }
            select
        }
        ControlKind::TextArea => {
            let area = document.create_element("textarea")?;
            area.set_attribute("rows", "4")?;
            area.set_text_content(Some(&spec.value));
            area
        }
        ControlKind::TextInput => {
            let input = document.create_element("input")?;
            input.set_attribute("type", "text")?;
            input.set_attribute("value", &spec.value)?;
            input
        }
        ControlKind::NumberInput { min, max, step } => {
            let input = document.create_element("input")?;
            input.set_attribute("type", "number")?;
            if let Some(min) = min {
                input.set_attribute("min", &format_number(*min))?;
            }
            if let Some(max) = max {
                input.set_attribute("max", &format_number(*max))?;
            }
            if let Some(step) = step {
                input.set_attribute("step", &format_number(*step))?;
            }
            input.set_attribute("value", &spec.value)?;
            input
        }
    };
    el.set_attribute("data-widget", &spec.widget_index.to_string())?;
    Ok(el)
}

/// One delegated `change` listener on the panel for the page's lifetime;
/// re-renders only replace the controls.
pub fn setup_change_listener(document: &Document) -> Result<(), JsValue> {
    let Some(panel) = document.get_element_by_id(INSPECTOR_ID) else {
        return Ok(());
    };
    let cb = Closure::wrap(Box::new(move |e: Event| {
        let Some(target) = e.target() else {
            return;
        };
        let Some(el) = target.dyn_ref::<Element>() else {
            return;
        };
        let Some((node_id, widget_index)) =
            control_target(el.get_attribute("data-node"), el.get_attribute("data-widget"))
        else {
            return;
        };
        let Some(raw) = control_value(&target) else {
            return;
        };
        dispatch_global_message(Message::WidgetEdited {
            node_id,
            widget_index,
            raw,
        });
    }) as Box<dyn FnMut(_)>);
    panel.add_event_listener_with_callback("change", cb.as_ref().unchecked_ref())?;
    cb.forget();
    Ok(())
}

/// The node and widget a control edits, from its `data-*` attributes.
pub fn control_target(node: Option<String>, widget: Option<String>) -> Option<(NodeId, usize)> {
    Some((node?.parse().ok()?, widget?.parse().ok()?))
}

fn control_value(target: &web_sys::EventTarget) -> Option<String> {
    if let Some(input) = target.dyn_ref::<HtmlInputElement>() {
        return Some(input.value());
    }
    if let Some(select) = target.dyn_ref::<HtmlSelectElement>() {
        return Some(select.value());
    }
    target.dyn_ref::<HtmlTextAreaElement>().map(|area| area.value())
}
