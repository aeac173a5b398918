use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event, HtmlSelectElement};

use crate::constants::{PALETTE_ID, QUEUE_BUTTON_ID, RESET_BUTTON_ID};
use crate::messages::Message;
use crate::state::dispatch_global_message;

pub fn setup_ui_event_handlers(document: &Document) -> Result<(), JsValue> {
    setup_button(document, QUEUE_BUTTON_ID, || Message::SubmitRequested)?;
    setup_button(document, RESET_BUTTON_ID, || Message::ResetWorkflow)?;
    setup_palette_handler(document)?;
    crate::components::inspector::setup_change_listener(document)?;
    setup_pagehide_handler()?;
    Ok(())
}

fn setup_button(document: &Document, id: &str, message: fn() -> Message) -> Result<(), JsValue> {
    let Some(button) = document.get_element_by_id(id) else {
        debug_log!("no #{} on the page", id);
        return Ok(());
    };
    let click_callback = Closure::wrap(Box::new(move |_e: Event| {
        dispatch_global_message(message());
    }) as Box<dyn FnMut(_)>);
    button.add_event_listener_with_callback("click", click_callback.as_ref().unchecked_ref())?;
    click_callback.forget();
    Ok(())
}

fn setup_palette_handler(document: &Document) -> Result<(), JsValue> {
    let Some(select) = document.get_element_by_id(PALETTE_ID) else {
        return Ok(());
    };
    let change_callback = Closure::wrap(Box::new(move |e: Event| {
        if let Some(select) = e.target().and_then(|t| t.dyn_into::<HtmlSelectElement>().ok()) {
            dispatch_global_message(Message::PaletteTypeChosen(select.value()));
        }
    }) as Box<dyn FnMut(_)>);
    select.add_event_listener_with_callback("change", change_callback.as_ref().unchecked_ref())?;
    change_callback.forget();
    Ok(())
}

/// Dropping the context closes the event stream and cancels all timers.
fn setup_pagehide_handler() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window exists"))?;
    let pagehide_callback = Closure::wrap(Box::new(move |_e: Event| {
        crate::state::teardown();
    }) as Box<dyn FnMut(_)>);
    window.add_event_listener_with_callback("pagehide", pagehide_callback.as_ref().unchecked_ref())?;
    pagehide_callback.forget();
    Ok(())
}
