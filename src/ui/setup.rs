use wasm_bindgen::prelude::*;
use web_sys::Document;

use crate::constants::{GATEWAY_LABEL_ID, PALETTE_ID};
use crate::registry::NodeRegistry;

/// Palette entries grouped by category, in registry sort order:
/// `(category, [(type_id, title)])`.
pub fn palette_groups(registry: &NodeRegistry) -> Vec<(String, Vec<(String, String)>)> {
    let mut groups: Vec<(String, Vec<(String, String)>)> = Vec::new();
    for desc in registry.types_sorted() {
        let entry = (desc.type_id.clone(), desc.title.clone());
        match groups.last_mut() {
            Some((category, entries)) if *category == desc.category => entries.push(entry),
            _ => groups.push((desc.category.clone(), vec![entry])),
        }
    }
    groups
}

/// Fill the node palette `<select>`, preselecting `selected`.
pub fn populate_palette(document: &Document, registry: &NodeRegistry, selected: &str) -> Result<(), JsValue> {
    let Some(select) = document.get_element_by_id(PALETTE_ID) else {
        return Ok(());
    };
    select.set_inner_html("");
    for (category, entries) in palette_groups(registry) {
        let group = document.create_element("optgroup")?;
        group.set_attribute("label", &category)?;
        for (type_id, title) in entries {
            let option = document.create_element("option")?;
            option.set_attribute("value", &type_id)?;
            option.set_text_content(Some(&title));
            if type_id == selected {
                option.set_attribute("selected", "")?;
            }
            group.append_child(&option)?;
        }
        select.append_child(&group)?;
    }
    Ok(())
}

pub fn show_gateway(document: &Document, base_url: &str) {
    if let Some(label) = document.get_element_by_id(GATEWAY_LABEL_ID) {
        label.set_text_content(Some(base_url));
    }
}
