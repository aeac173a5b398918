//! Server-sent event channel for one job.
//!
//! The wrapper owns its `EventSource` and the JS callbacks.  Dropping it
//! detaches the callbacks and closes the connection, so a replaced watch
//! session can never deliver into the new one.

use wasm_bindgen::prelude::*;
use web_sys::{Event, EventSource, MessageEvent};

use crate::constants::{STREAM_INITIAL_BACKOFF_MS, STREAM_MAX_BACKOFF_MS, STREAM_MAX_RECONNECT_ATTEMPTS};

/// Bounded exponential backoff for re-opening the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u32,
    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u32,
    /// Attempts before giving up on the stream
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_ms: STREAM_INITIAL_BACKOFF_MS,
            max_backoff_ms: STREAM_MAX_BACKOFF_MS,
            max_attempts: STREAM_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect number `attempt` (zero based), or `None` once
    /// the attempts are used up.
    pub fn delay_for(&self, attempt: u32) -> Option<u32> {
        if attempt >= self.max_attempts {
            return None;
        }
        let delay = self
            .initial_backoff_ms
            .saturating_mul(2_u32.pow(attempt.min(10))); // Prevent overflow with min(10)
        Some(delay.min(self.max_backoff_ms))
    }
}

pub struct EventStream {
    source: EventSource,
    url: String,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl EventStream {
    pub fn open<O, M, E>(url: &str, mut on_open: O, mut on_message: M, mut on_error: E) -> Result<Self, JsValue>
    where
        O: FnMut() + 'static,
        M: FnMut(String) + 'static,
        E: FnMut() + 'static,
    {
        let source = EventSource::new(url)?;

        let open_cb = Closure::wrap(Box::new(move |_e: Event| on_open()) as Box<dyn FnMut(Event)>);
        source.set_onopen(Some(open_cb.as_ref().unchecked_ref()));

        let message_cb = Closure::wrap(Box::new(move |e: MessageEvent| {
            // Non-string payloads (binary frames) are not part of the protocol.
            if let Some(data) = e.data().as_string() {
                on_message(data);
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        source.set_onmessage(Some(message_cb.as_ref().unchecked_ref()));

        let error_cb = Closure::wrap(Box::new(move |_e: Event| on_error()) as Box<dyn FnMut(Event)>);
        source.set_onerror(Some(error_cb.as_ref().unchecked_ref()));

        Ok(Self {
            source,
            url: url.to_string(),
            _on_open: open_cb,
            _on_message: message_cb,
            _on_error: error_cb,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.source.set_onopen(None);
        self.source.set_onmessage(None);
        self.source.set_onerror(None);
        self.source.close();
        debug_log!("event stream closed: {}", self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_gives_up() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<_> = (0..6).map(|a| policy.delay_for(a)).collect();
        assert_eq!(
            delays,
            [Some(1000), Some(2000), Some(4000), Some(8000), Some(16000), None]
        );
    }

    #[test]
    fn backoff_is_capped() {
        let policy = ReconnectPolicy {
            max_attempts: 20,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(5), Some(30000));
        assert_eq!(policy.delay_for(15), Some(30000));
    }
}
