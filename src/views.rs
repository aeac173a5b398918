// frontend/src/views.rs
//
// Refresh functions for the page panels.  Each one reads the state and
// rewrites exactly one region of the DOM.

use wasm_bindgen::JsValue;
use web_sys::Document;

use crate::components::{inspector, log_view, output_view, queue_view};
use crate::constants::STATUS_ID;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Inspector,
    Queue,
    Log,
    Output,
    Status,
}

pub fn render_panel(panel: Panel, state: &AppState, document: &Document) -> Result<(), JsValue> {
    match panel {
        Panel::Inspector => inspector::render(document, inspector::snapshot(state).as_ref()),
        Panel::Queue => queue_view::render(document, &state.jobs),
        Panel::Log => log_view::render(document, &state.log),
        Panel::Output => output_view::render(document, state.output.as_ref()),
        Panel::Status => {
            render_status(state, document);
            Ok(())
        }
    }
}

pub fn render_all(state: &AppState, document: &Document) -> Result<(), JsValue> {
    for panel in [
        Panel::Inspector,
        Panel::Queue,
        Panel::Log,
        Panel::Output,
        Panel::Status,
    ] {
        render_panel(panel, state, document)?;
    }
    Ok(())
}

pub fn render_status(state: &AppState, document: &Document) {
    if let Some(el) = document.get_element_by_id(STATUS_ID) {
        el.set_text_content(Some(&state.status_text));
    }
}
