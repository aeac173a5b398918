use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, CanvasRenderingContext2d, Document, Element, HtmlCanvasElement,
    KeyboardEvent, MouseEvent, PointerEvent, WheelEvent,
};

use crate::canvas::CanvasSurface;
use crate::messages::Message;
use crate::state::dispatch_global_message;

/// Grab the 2D context of the `#graph` canvas.
pub fn create_surface(canvas: HtmlCanvasElement) -> Result<CanvasSurface, JsValue> {
    let context = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    Ok(CanvasSurface { canvas, context })
}

pub fn setup_canvas(document: &Document, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    setup_pointer_events(canvas)?;
    setup_wheel(canvas)?;
    setup_double_click(canvas)?;
    setup_delete_key(document)?;
    setup_resize_handler(canvas)?;

    // Size the backing store once right away.
    dispatch_resize(canvas);
    Ok(())
}

/// Measure the canvas' container and report CSS size plus pixel ratio.
pub fn dispatch_resize(canvas: &HtmlCanvasElement) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let dpr = window.device_pixel_ratio();
    let (width, height) = match canvas.parent_element() {
        Some(parent) => (parent.client_width() as f64, parent.client_height() as f64),
        None => (canvas.client_width() as f64, canvas.client_height() as f64),
    };
    let style = canvas.style();
    let _ = style.set_property("width", &format!("{}px", width));
    let _ = style.set_property("height", &format!("{}px", height));
    dispatch_global_message(Message::CanvasResized { width, height, dpr });
}

fn setup_resize_handler(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window exists"))?;
    let canvas_clone = canvas.clone();
    let resize_callback = Closure::wrap(Box::new(move || {
        dispatch_resize(&canvas_clone);
    }) as Box<dyn FnMut()>);
    window.add_event_listener_with_callback("resize", resize_callback.as_ref().unchecked_ref())?;
    // Leak the closure to keep it alive for the lifetime of the application
    resize_callback.forget();
    Ok(())
}

fn setup_pointer_events(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let canvas_clone = canvas.clone();
    let down = Closure::wrap(Box::new(move |event: PointerEvent| {
        // Primary button only; right click is left to the browser.
        if event.button() != 0 {
            return;
        }
        let _ = canvas_clone.set_pointer_capture(event.pointer_id());
        dispatch_global_message(Message::CanvasPointerDown {
            x: event.offset_x() as f64,
            y: event.offset_y() as f64,
        });
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("pointerdown", down.as_ref().unchecked_ref())?;
    down.forget();

    let mv = Closure::wrap(Box::new(move |event: PointerEvent| {
        dispatch_global_message(Message::CanvasPointerMove {
            x: event.offset_x() as f64,
            y: event.offset_y() as f64,
        });
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("pointermove", mv.as_ref().unchecked_ref())?;
    mv.forget();

    // A cancelled pointer ends the gesture just like a release.
    for event_name in ["pointerup", "pointercancel"] {
        let up = Closure::wrap(Box::new(move |event: PointerEvent| {
            dispatch_global_message(Message::CanvasPointerUp {
                x: event.offset_x() as f64,
                y: event.offset_y() as f64,
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback(event_name, up.as_ref().unchecked_ref())?;
        up.forget();
    }
    Ok(())
}

fn setup_wheel(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let wheel = Closure::wrap(Box::new(move |event: WheelEvent| {
        event.prevent_default();
        dispatch_global_message(Message::CanvasWheel {
            x: event.offset_x() as f64,
            y: event.offset_y() as f64,
            delta_y: event.delta_y(),
        });
    }) as Box<dyn FnMut(_)>);
    // Non-passive so prevent_default() keeps the page from scrolling.
    let options = AddEventListenerOptions::new();
    options.set_passive(false);
    canvas.add_event_listener_with_callback_and_add_event_listener_options(
        "wheel",
        wheel.as_ref().unchecked_ref(),
        &options,
    )?;
    wheel.forget();
    Ok(())
}

fn setup_double_click(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let dblclick = Closure::wrap(Box::new(move |event: MouseEvent| {
        event.prevent_default();
        dispatch_global_message(Message::CanvasDoubleClick {
            x: event.offset_x() as f64,
            y: event.offset_y() as f64,
        });
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("dblclick", dblclick.as_ref().unchecked_ref())?;
    dblclick.forget();
    Ok(())
}

/// True for keys that should delete the selected node.
pub fn is_delete_key(key: &str) -> bool {
    matches!(key, "Delete" | "Backspace")
}

/// Form fields keep their own Backspace/Delete behaviour.
pub fn is_form_field(tag_name: &str) -> bool {
    matches!(
        tag_name.to_ascii_uppercase().as_str(),
        "INPUT" | "TEXTAREA" | "SELECT"
    )
}

fn setup_delete_key(document: &Document) -> Result<(), JsValue> {
    let keydown = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        if !is_delete_key(&event.key()) {
            return;
        }
        let in_form = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .map(|el| is_form_field(&el.tag_name()) || el.has_attribute("contenteditable"))
            .unwrap_or(false);
        if in_form {
            return;
        }
        event.prevent_default();
        dispatch_global_message(Message::DeleteSelected);
    }) as Box<dyn FnMut(_)>);
    document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
    keydown.forget();
    Ok(())
}
