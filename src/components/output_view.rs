use wasm_bindgen::prelude::*;
use web_sys::Document;

use crate::constants::{OUTPUT_IMAGE_ID, OUTPUT_META_ID};
use crate::dom_utils::{hide, show};
use crate::models::OutputPreview;

/// Point the preview `<img>` at the job output.  The browser does the
/// fetching; nothing is requested from here.
pub fn render(document: &Document, output: Option<&OutputPreview>) -> Result<(), JsValue> {
    let image = document.get_element_by_id(OUTPUT_IMAGE_ID);
    let Some(output) = output else {
        if let Some(img) = &image {
            hide(img);
        }
        return Ok(());
    };
    if let Some(img) = &image {
        img.set_attribute("src", &output.url)?;
        img.set_attribute("alt", &output.caption)?;
        show(img);
    }
    if let Some(meta) = document.get_element_by_id(OUTPUT_META_ID) {
        meta.set_text_content(Some(&output.caption));
    }
    Ok(())
}
