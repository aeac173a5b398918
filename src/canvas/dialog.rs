//! Widget value prompt.
//!
//! A small DOM overlay placed over the canvas.  It is always created with
//! browser autofill and text correction disabled and a stacking order above
//! the canvas, so it stays usable whatever the page styles say.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlElement, KeyboardEvent};

use crate::constants::DIALOG_Z_INDEX;

pub const PROMPT_ID: &str = "graph-prompt";

// Handlers of the open prompt.  Replaced on the next open, so at most one
// prompt's closures are alive at a time.
thread_local! {
    static PROMPT_HANDLERS: RefCell<Vec<Closure<dyn FnMut(Event)>>> = const { RefCell::new(Vec::new()) };
}

/// Attributes every prompt input carries.
pub const INPUT_ATTRIBUTES: [(&str, &str); 4] = [
    ("autocomplete", "off"),
    ("autocorrect", "off"),
    ("autocapitalize", "off"),
    ("spellcheck", "false"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub label: String,
    pub value: String,
    pub multiline: bool,
    pub numeric: bool,
    /// Page coordinates of the dialog's top-left corner.
    pub at: [f64; 2],
}

pub fn prompt_style(at: [f64; 2]) -> String {
    format!(
        "position: fixed; left: {:.0}px; top: {:.0}px; z-index: {}; pointer-events: auto;",
        at[0], at[1], DIALOG_Z_INDEX
    )
}

pub fn close_prompt(document: &Document) {
    if let Some(el) = document.get_element_by_id(PROMPT_ID) {
        el.remove();
    }
}

/// Show the prompt.  `on_close` receives the entered text, or `None` when
/// the prompt was cancelled (Escape or focus loss).  It runs exactly once.
pub fn open_prompt<F>(document: &Document, request: &PromptRequest, on_close: F) -> Result<(), JsValue>
where
    F: Fn(Option<String>) + 'static,
{
    close_prompt(document);

    let container = document.create_element("div")?;
    container.set_id(PROMPT_ID);
    container.set_class_name("graph-dialog");
    container.set_attribute("style", &prompt_style(request.at))?;

    let label = document.create_element("span")?;
    label.set_class_name("name");
    label.set_text_content(Some(&request.label));
    container.append_child(&label)?;

    let input: Element = if request.multiline {
        document.create_element("textarea")?
    } else {
        let el = document.create_element("input")?;
        el.set_attribute("type", if request.numeric { "number" } else { "text" })?;
        el
    };
    input.set_class_name("value");
    for (name, value) in INPUT_ATTRIBUTES {
        input.set_attribute(name, value)?;
    }
    set_input_value(&input, &request.value);
    container.append_child(&input)?;

    let body = document.body().ok_or_else(|| JsValue::from_str("document has no body"))?;
    body.append_child(&container)?;

    let closed = Rc::new(Cell::new(false));
    let on_close = Rc::new(on_close);
    let finish = {
        let closed = closed.clone();
        let container = container.clone();
        move |value: Option<String>| {
            if closed.replace(true) {
                return;
            }
            container.remove();
            on_close(value);
        }
    };
    let finish = Rc::new(finish);

    let keydown = {
        let finish = finish.clone();
        let input_ref = input.clone();
        let multiline = request.multiline;
        Closure::wrap(Box::new(move |e: Event| {
            let Some(e) = e.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            match e.key().as_str() {
                "Enter" if !(multiline && e.shift_key()) => {
                    e.prevent_default();
                    finish(Some(read_input_value(&input_ref)));
                }
                "Escape" => {
                    e.prevent_default();
                    finish(None);
                }
                _ => {}
            }
        }) as Box<dyn FnMut(_)>)
    };
    input.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;

    let blur = {
        let finish = finish.clone();
        Closure::wrap(Box::new(move |_e: Event| {
            finish(None);
        }) as Box<dyn FnMut(_)>)
    };
    input.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;

    PROMPT_HANDLERS.with(|handlers| *handlers.borrow_mut() = vec![keydown, blur]);

    if let Some(el) = input.dyn_ref::<HtmlElement>() {
        let _ = el.focus();
    }
    if let Some(el) = input.dyn_ref::<web_sys::HtmlInputElement>() {
        el.select();
    }
    Ok(())
}

fn set_input_value(input: &Element, value: &str) {
    if let Some(el) = input.dyn_ref::<web_sys::HtmlInputElement>() {
        el.set_value(value);
    } else if let Some(el) = input.dyn_ref::<web_sys::HtmlTextAreaElement>() {
        el.set_value(value);
    }
}

fn read_input_value(input: &Element) -> String {
    if let Some(el) = input.dyn_ref::<web_sys::HtmlInputElement>() {
        el.value()
    } else if let Some(el) = input.dyn_ref::<web_sys::HtmlTextAreaElement>() {
        el.value()
    } else {
        String::new()
    }
}
