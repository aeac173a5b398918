use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::constants::{LOG_ID, LOG_MAX_ENTRIES};
use crate::models::LogEntry;
use crate::utils::format_clock;

const RENDERED_SEQ_ATTR: &str = "data-last-seq";

pub fn format_entry(entry: &LogEntry) -> String {
    format!("[{}] {}", format_clock(entry.at_ms), entry.text)
}

/// Entries not yet on screen, given the last rendered sequence number.
pub fn entries_after(log: &[LogEntry], last_seq: u64) -> &[LogEntry] {
    let start = log.partition_point(|e| e.seq <= last_seq);
    &log[start..]
}

/// Append entries that are not on screen yet and scroll to the newest.
pub fn render(document: &Document, log: &[LogEntry]) -> Result<(), JsValue> {
    let Some(container) = document.get_element_by_id(LOG_ID) else {
        return Ok(());
    };
    let last_seq = container
        .get_attribute(RENDERED_SEQ_ATTR)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let fresh = entries_after(log, last_seq);
    let Some(newest) = fresh.last() else {
        return Ok(());
    };
    for entry in fresh {
        let line = document.create_element("div")?;
        line.set_text_content(Some(&format_entry(entry)));
        container.append_child(&line)?;
    }
    container.set_attribute(RENDERED_SEQ_ATTR, &newest.seq.to_string())?;
    while container.child_element_count() as usize > LOG_MAX_ENTRIES {
        match container.first_element_child() {
            Some(oldest) => oldest.remove(),
            None => break,
        }
    }

    // Auto-scroll to bottom
    if let Some(html_el) = container.dyn_ref::<HtmlElement>() {
        html_el.set_scroll_top(html_el.scroll_height());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: u64, text: &str) -> LogEntry {
        LogEntry {
            seq,
            at_ms: 1_704_112_496_000,
            text: text.into(),
        }
    }

    #[test]
    fn only_new_entries_are_appended() {
        let log = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];
        assert_eq!(entries_after(&log, 0).len(), 3);
        let fresh = entries_after(&log, 2);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].text, "c");
        assert!(entries_after(&log, 3).is_empty());
    }

    #[test]
    fn lines_carry_a_clock_prefix() {
        assert_eq!(format_entry(&entry(1, "Event stream connected.")), "[12:34:56] Event stream connected.");
    }
}
