//! Canvas/graph reducer.
//!
//! Handles pointer input, zoom, node palette, deletion and widget edits.
//! Every change to the graph goes through the edit-tracking hook in
//! `reducers::jobs`.

use crate::canvas::interaction::{hit_test, PointerOutcome, PointerTarget};
use crate::canvas::GraphCanvas;
use crate::graph::{NodeId, WidgetValue};
use crate::messages::{Command, Message};
use crate::reducers::jobs::note_graph_edit;
use crate::state::AppState;

const WHEEL_ZOOM_STEP: f64 = 1.1;

pub fn update(state: &mut AppState, msg: &Message, cmds: &mut Vec<Command>) -> bool {
    match msg {
        Message::CanvasPointerDown { x, y } => {
            let selected_before = state.canvas.interaction.selected;
            let canvas = &mut state.canvas;
            let world = canvas.viewport.to_world([*x, *y]);
            let outcome = canvas
                .interaction
                .pointer_down(&mut canvas.graph, &canvas.registry, world, [*x, *y]);
            handle_outcome(state, outcome, cmds);
            if state.canvas.interaction.selected != selected_before {
                cmds.push(Command::RenderInspector);
            }
        }
        Message::CanvasPointerMove { x, y } => {
            let canvas = &mut state.canvas;
            let world = canvas.viewport.to_world([*x, *y]);
            if canvas
                .interaction
                .pointer_move(&mut canvas.graph, &mut canvas.viewport, world, [*x, *y])
            {
                cmds.push(Command::Redraw);
            }
        }
        Message::CanvasPointerUp { x, y } => {
            let canvas = &mut state.canvas;
            let world = canvas.viewport.to_world([*x, *y]);
            let outcome = canvas.interaction.pointer_up(&mut canvas.graph, world);
            handle_outcome(state, outcome, cmds);
        }
        Message::CanvasWheel { x, y, delta_y } => {
            let factor = if *delta_y < 0.0 {
                WHEEL_ZOOM_STEP
            } else {
                1.0 / WHEEL_ZOOM_STEP
            };
            state.canvas.viewport.zoom_at([*x, *y], factor);
            cmds.push(Command::Redraw);
        }
        Message::CanvasDoubleClick { x, y } => {
            let world = state.canvas.viewport.to_world([*x, *y]);
            if hit_test(&state.canvas.graph, &state.canvas.registry, world) != PointerTarget::Empty {
                return true;
            }
            let type_id = state.palette_type.clone();
            match state.canvas.add_node(&type_id, world) {
                Ok(id) => {
                    debug_log!("added {} node {}", type_id, id);
                    note_graph_edit(state, cmds);
                    cmds.push(Command::Redraw);
                    cmds.push(Command::RenderInspector);
                }
                Err(e) => warn_log!("cannot add node: {}", e),
            }
        }
        Message::DeleteSelected => {
            if state.canvas.interaction.dialog_open {
                return true;
            }
            if let Some(id) = state.canvas.remove_selected() {
                debug_log!("removed node {}", id);
                note_graph_edit(state, cmds);
                cmds.push(Command::Redraw);
                cmds.push(Command::RenderInspector);
            }
        }
        Message::PaletteTypeChosen(type_id) => {
            if state.canvas.registry.get(type_id).is_some() {
                state.palette_type = type_id.clone();
            } else {
                warn_log!("unknown node type in palette: {}", type_id);
            }
        }
        Message::CanvasResized { width, height, dpr } => {
            state.canvas.resize(*width, *height, *dpr);
            cmds.push(Command::Redraw);
        }
        Message::GraphReplaced => {
            cmds.push(Command::Redraw);
            cmds.push(Command::RenderInspector);
        }
        Message::WidgetEdited {
            node_id,
            widget_index,
            raw,
        } => {
            // Coming from the inspector itself; re-render only if the hook
            // changed what the user typed.
            if let Some(stored) = edit_widget(state, *node_id, *widget_index, raw, cmds) {
                if state.canvas.widget(*node_id, *widget_index).map(|w| w.parse(raw).ok())
                    != Some(Some(stored))
                {
                    cmds.push(Command::RenderInspector);
                }
            }
        }
        Message::PromptClosed {
            node_id,
            widget_index,
            value,
        } => {
            state.canvas.interaction.close_dialog();
            if let Some(raw) = value {
                if edit_widget(state, *node_id, *widget_index, raw, cmds).is_some() {
                    cmds.push(Command::RenderInspector);
                }
            }
            cmds.push(Command::Redraw);
        }
        _ => return false,
    }
    true
}

fn handle_outcome(state: &mut AppState, outcome: PointerOutcome, cmds: &mut Vec<Command>) {
    match outcome {
        PointerOutcome::Nothing => {}
        PointerOutcome::Redraw => cmds.push(Command::Redraw),
        PointerOutcome::GraphEdited => {
            note_graph_edit(state, cmds);
            cmds.push(Command::Redraw);
        }
        PointerOutcome::WidgetEdit {
            node_id,
            widget_index,
            value,
        } => {
            if store_widget(state, node_id, widget_index, value, cmds).is_some() {
                cmds.push(Command::RenderInspector);
            }
        }
        PointerOutcome::OpenPrompt {
            node_id,
            widget_index,
        } => {
            state.canvas.interaction.open_dialog();
            cmds.push(Command::OpenPrompt {
                node_id,
                widget_index,
            });
        }
    }
}

/// Parse `raw` for the widget and store it.  Returns the stored value, or
/// `None` when nothing was written.
fn edit_widget(
    state: &mut AppState,
    node_id: NodeId,
    widget_index: usize,
    raw: &str,
    cmds: &mut Vec<Command>,
) -> Option<WidgetValue> {
    // Deleted while the prompt or inspector was open.
    let widget = state.canvas.widget(node_id, widget_index)?;
    match widget.parse(raw) {
        Ok(value) => store_widget(state, node_id, widget_index, value, cmds),
        Err(e) => {
            state.append_log(format!("Ignored edit: {}", e));
            cmds.push(Command::RenderLog);
            None
        }
    }
}

fn store_widget(
    state: &mut AppState,
    node_id: NodeId,
    widget_index: usize,
    value: WidgetValue,
    cmds: &mut Vec<Command>,
) -> Option<WidgetValue> {
    match state.canvas.write_widget(node_id, widget_index, value) {
        Ok(true) => {
            note_graph_edit(state, cmds);
            cmds.push(Command::Redraw);
            state.canvas.widget_value(node_id, widget_index)
        }
        Ok(false) => None,
        Err(e) => {
            warn_log!("widget write failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::interaction::DragState;
    use crate::models::NodeRunState;
    use crate::network::GatewayConfig;

    fn state() -> AppState {
        AppState::new(GatewayConfig::from_url("http://gw"))
    }

    fn run(state: &mut AppState, msg: Message) -> Vec<Command> {
        let mut cmds = Vec::new();
        assert!(update(state, &msg, &mut cmds));
        cmds
    }

    #[test]
    fn inspector_edit_clamps_and_writes() {
        let mut s = state();
        let id = s.canvas.add_node("KSampler", [0.0, 0.0]).unwrap();
        let cmds = run(
            &mut s,
            Message::WidgetEdited {
                node_id: id,
                widget_index: 1,
                raw: "250".into(),
            },
        );
        assert_eq!(s.canvas.widget_value(id, 1), Some(WidgetValue::Number(100.0)));
        assert!(cmds.contains(&Command::Redraw));
        // The clamp changed the value, so the inspector must show it.
        assert!(cmds.contains(&Command::RenderInspector));
    }

    #[test]
    fn in_range_inspector_edit_does_not_rerender_the_form() {
        let mut s = state();
        let id = s.canvas.add_node("KSampler", [0.0, 0.0]).unwrap();
        let cmds = run(
            &mut s,
            Message::WidgetEdited {
                node_id: id,
                widget_index: 1,
                raw: "30".into(),
            },
        );
        assert_eq!(s.canvas.widget_value(id, 1), Some(WidgetValue::Number(30.0)));
        assert!(!cmds.contains(&Command::RenderInspector));
    }

    #[test]
    fn unparsable_number_is_logged_and_ignored() {
        let mut s = state();
        let id = s.canvas.add_node("KSampler", [0.0, 0.0]).unwrap();
        let before = s.canvas.widget_value(id, 1);
        let cmds = run(
            &mut s,
            Message::WidgetEdited {
                node_id: id,
                widget_index: 1,
                raw: "lots".into(),
            },
        );
        assert_eq!(s.canvas.widget_value(id, 1), before);
        assert!(cmds.contains(&Command::RenderLog));
        assert!(s.log.last().unwrap().text.starts_with("Ignored edit"));
    }

    #[test]
    fn edit_of_deleted_node_is_ignored() {
        let mut s = state();
        let cmds = run(
            &mut s,
            Message::WidgetEdited {
                node_id: 77,
                widget_index: 0,
                raw: "x".into(),
            },
        );
        assert!(cmds.is_empty());
        assert!(s.log.is_empty());
    }

    #[test]
    fn edit_after_failure_clears_overlays() {
        let mut s = state();
        let id = s.canvas.add_node("SaveImage", [0.0, 0.0]).unwrap();
        s.canvas.set_node_state(id, Some(NodeRunState::Failed));
        s.last_status = Some("failed".into());
        s.status_text = "failed".into();
        run(
            &mut s,
            Message::WidgetEdited {
                node_id: id,
                widget_index: 0,
                raw: "renders".into(),
            },
        );
        assert!(s.canvas.node_states.is_empty());
        assert_eq!(s.status_text, "Idle");
        let node = s.canvas.graph.node(id).unwrap();
        assert_eq!(node.properties["filename_prefix"], serde_json::json!("renders"));
    }

    #[test]
    fn double_click_on_empty_canvas_adds_palette_node() {
        let mut s = state();
        run(&mut s, Message::PaletteTypeChosen("VAEDecode".into()));
        let cmds = run(&mut s, Message::CanvasDoubleClick { x: 50.0, y: 60.0 });
        assert_eq!(s.canvas.graph.nodes.len(), 1);
        assert_eq!(s.canvas.graph.nodes[0].type_id, "VAEDecode");
        assert!(cmds.contains(&Command::RenderInspector));

        // On top of an existing node nothing is added.
        run(&mut s, Message::CanvasDoubleClick { x: 60.0, y: 70.0 });
        assert_eq!(s.canvas.graph.nodes.len(), 1);
    }

    #[test]
    fn double_click_with_exhausted_node_ids_adds_nothing() {
        let mut s = state();
        s.canvas
            .load_graph(&serde_json::json!({
                "last_node_id": u32::MAX,
                "nodes": [{"id": 1, "type": "VAEDecode", "pos": [0, 0]}]
            }))
            .unwrap();
        let cmds = run(&mut s, Message::CanvasDoubleClick { x: 900.0, y: 700.0 });
        assert_eq!(s.canvas.graph.nodes.len(), 1);
        assert!(!cmds.contains(&Command::RenderInspector));
    }

    #[test]
    fn unknown_palette_type_is_rejected() {
        let mut s = state();
        let before = s.palette_type.clone();
        run(&mut s, Message::PaletteTypeChosen("Nope".into()));
        assert_eq!(s.palette_type, before);
    }

    #[test]
    fn delete_removes_selected_node() {
        let mut s = state();
        s.canvas.add_node("VAEDecode", [0.0, 0.0]).unwrap();
        let cmds = run(&mut s, Message::DeleteSelected);
        assert!(s.canvas.graph.is_empty());
        assert!(cmds.contains(&Command::RenderInspector));
        // Nothing selected any more.
        assert!(run(&mut s, Message::DeleteSelected).is_empty());
    }

    #[test]
    fn clicking_empty_canvas_deselects_and_pans() {
        let mut s = state();
        s.canvas.add_node("VAEDecode", [0.0, 0.0]).unwrap();
        let cmds = run(&mut s, Message::CanvasPointerDown { x: 900.0, y: 900.0 });
        assert!(s.canvas.interaction.selected.is_none());
        assert!(cmds.contains(&Command::RenderInspector));
        run(&mut s, Message::CanvasPointerMove { x: 910.0, y: 920.0 });
        assert_eq!(s.canvas.viewport.offset, [10.0, 20.0]);
        run(&mut s, Message::CanvasPointerUp { x: 910.0, y: 920.0 });
        assert_eq!(s.canvas.interaction.drag, DragState::Idle);
    }

    #[test]
    fn wheel_zooms_in_and_out() {
        let mut s = state();
        run(&mut s, Message::CanvasWheel { x: 0.0, y: 0.0, delta_y: -1.0 });
        assert!(s.canvas.viewport.scale > 1.0);
        run(&mut s, Message::CanvasWheel { x: 0.0, y: 0.0, delta_y: 1.0 });
        run(&mut s, Message::CanvasWheel { x: 0.0, y: 0.0, delta_y: 1.0 });
        assert!(s.canvas.viewport.scale < 1.0);
    }

    #[test]
    fn closing_the_prompt_restores_interaction() {
        let mut s = state();
        let id = s.canvas.add_node("CLIPTextEncode", [0.0, 0.0]).unwrap();
        s.canvas.interaction.open_dialog();
        assert!(!s.canvas.interaction.flags.is_interactive());
        run(
            &mut s,
            Message::PromptClosed {
                node_id: id,
                widget_index: 0,
                value: None,
            },
        );
        assert!(s.canvas.interaction.flags.is_interactive());
        assert!(!s.canvas.interaction.dialog_open);

        run(
            &mut s,
            Message::PromptClosed {
                node_id: id,
                widget_index: 0,
                value: Some("a castle".into()),
            },
        );
        assert_eq!(s.canvas.widget_value(id, 0), Some(WidgetValue::from("a castle")));
    }

    #[test]
    fn resize_tracks_css_size_and_ratio() {
        let mut s = state();
        run(
            &mut s,
            Message::CanvasResized {
                width: 800.0,
                height: 600.0,
                dpr: 2.0,
            },
        );
        assert_eq!(s.canvas.css_size(), (800.0, 600.0));
        assert_eq!(s.canvas.dpr(), 2.0);
    }
}
