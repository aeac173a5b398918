use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

#[macro_use]
pub mod macros;

pub mod canvas;
pub mod command_executors;
pub mod components;
pub mod constants; // Module for constants and default values
pub mod dom_utils;
pub mod error;
pub mod graph;
pub mod messages;
pub mod models;
pub mod network;
pub mod reducers;
pub mod registry;
pub mod state;
pub mod ui;
pub mod update;
pub mod utils;
pub mod views;

use canvas::GraphCanvas;
use messages::{Command, Message};
use network::GatewayConfig;
use state::AppState;

// Main entry point for the WASM application
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    // Initialize better panic messages
    console_error_panic_hook::set_once();

    let Some(document) = dom_utils::document() else {
        warn_log!("no document; editor not started");
        return Ok(());
    };
    let Some(canvas_el) = document.get_element_by_id(constants::CANVAS_ID) else {
        warn_log!("#{} not found; editor not started", constants::CANVAS_ID);
        return Ok(());
    };
    let canvas_el: HtmlCanvasElement = canvas_el
        .dyn_into()
        .map_err(|_| error::FrontendError::MissingElement(constants::CANVAS_ID.to_string()))?;

    let mut app = AppState::new(GatewayConfig::from_window());
    app.canvas
        .attach(components::canvas_editor::create_surface(canvas_el.clone())?);
    ui::setup::show_gateway(&document, app.gateway.base_url());
    ui::setup::populate_palette(&document, &app.canvas.registry, &app.palette_type)?;
    debug_log!("gateway at {}", app.gateway.base_url());
    state::init(app);

    components::canvas_editor::setup_canvas(&document, &canvas_el)?;
    ui::events::setup_ui_event_handlers(&document)?;

    if let Some(ctx) = state::context() {
        views::render_all(&ctx.state.borrow(), &document)?;
    }

    state::execute_commands(vec![Command::FetchDefaultWorkflow, Command::FetchCheckpoints]);
    Ok(())
}

/// Replace the editor graph with a LiteGraph-format workflow.
#[wasm_bindgen]
pub fn load_graph(json: JsValue) -> Result<(), JsValue> {
    let value: serde_json::Value = serde_wasm_bindgen::from_value(json)?;
    state::with_state(|s| s.canvas.load_graph(&value))
        .ok_or_else(|| JsValue::from_str("editor not started"))??;
    state::dispatch_global_message(Message::GraphReplaced);
    Ok(())
}

/// The current graph in LiteGraph format.
#[wasm_bindgen]
pub fn serialize_graph() -> Result<JsValue, JsValue> {
    let value = state::with_state(|s| s.canvas.serialize_graph())
        .ok_or_else(|| JsValue::from_str("editor not started"))?;
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}
