//! Utility helpers shared across the WASM frontend.

use unicode_segmentation::UnicodeSegmentation;

/// Return the current timestamp in **milliseconds** since UNIX epoch.
///
/// chrono's `wasmbind` feature routes this through `Date.now()` in the
/// browser and the system clock natively, so reducers stay testable.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Format an epoch-millisecond timestamp as a `HH:MM:SS` clock (UTC).
pub fn format_clock(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Shorten `text` to at most `max` user-perceived characters, appending an
/// ellipsis when something was cut.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = graphemes[..max - 1].concat();
    out.push('…');
    out
}

/// Format a number for display inside a widget: integers without a
/// fractional part, everything else with up to three decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.3}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
