//! Workflow asset and checkpoint discovery.

use crate::canvas::GraphCanvas;
use crate::messages::{Command, Message};
use crate::state::AppState;

pub const CHECKPOINT_NODE: &str = "CheckpointLoaderSimple";
pub const CHECKPOINT_WIDGET: &str = "ckpt_name";

pub fn update(state: &mut AppState, msg: &Message, cmds: &mut Vec<Command>) -> bool {
    match msg {
        Message::ResetWorkflow => {
            state.canvas.clear_node_states();
            cmds.push(Command::Redraw);
            cmds.push(Command::FetchDefaultWorkflow);
        }
        Message::WorkflowLoaded(json) => {
            match state.canvas.load_graph(json) {
                Ok(()) => state.append_log("Loaded default workflow JSON."),
                Err(e) => {
                    state.canvas.clear();
                    state.append_log(format!("Workflow load error: {}", e));
                }
            }
            cmds.push(Command::Redraw);
            cmds.push(Command::RenderInspector);
            cmds.push(Command::RenderLog);
        }
        Message::WorkflowLoadFailed(error) => {
            state.canvas.clear();
            state.append_log(format!("Workflow load error: {}", error));
            cmds.push(Command::Redraw);
            cmds.push(Command::RenderInspector);
            cmds.push(Command::RenderLog);
        }
        Message::CheckpointsLoaded(names) => {
            let count = names.len();
            let graph = Some(&mut state.canvas.graph);
            match state
                .canvas
                .registry
                .update_widget_values(CHECKPOINT_NODE, CHECKPOINT_WIDGET, names.clone(), graph)
            {
                Ok(reset) => {
                    if !reset.is_empty() {
                        debug_log!("reset checkpoint on nodes {:?}", reset);
                        cmds.push(Command::Redraw);
                        cmds.push(Command::RenderInspector);
                    }
                    state.append_log(format!("Loaded {} checkpoints", count));
                }
                Err(e) => state.append_log(format!("Checkpoint discovery failed: {}", e)),
            }
            cmds.push(Command::RenderLog);
        }
        Message::CheckpointsFailed(error) => {
            state.append_log(format!("Checkpoint discovery failed: {}", error));
            cmds.push(Command::RenderLog);
        }
        _ => return false,
    }
    true
}
