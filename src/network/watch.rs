//! Live-status resources for the watched job.
//!
//! A [`WatchSession`] owns the push channel, the poll timer and a pending
//! reconnect timer for one job.  Every resource is released by dropping it,
//! and [`WatchSlot`] holds at most one session, so replacing the session is
//! the whole teardown.

use gloo_timers::callback::{Interval, Timeout};

use super::event_stream::EventStream;

pub struct WatchSession<S = EventStream, P = Interval, R = Timeout> {
    pub job_id: String,
    pub generation: u64,
    stream: Option<S>,
    poll: Option<P>,
    reconnect: Option<R>,
}

impl<S, P, R> WatchSession<S, P, R> {
    pub fn new(job_id: &str, generation: u64) -> Self {
        Self {
            job_id: job_id.to_string(),
            generation,
            stream: None,
            poll: None,
            reconnect: None,
        }
    }

    /// Install a (re)opened stream.  Any pending reconnect is spent.
    pub fn set_stream(&mut self, stream: S) {
        self.reconnect = None;
        self.stream = Some(stream);
    }

    pub fn close_stream(&mut self) {
        self.stream = None;
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    pub fn set_poll(&mut self, timer: P) {
        self.poll = Some(timer);
    }

    pub fn stop_polling(&mut self) {
        self.poll = None;
    }

    pub fn schedule_reconnect(&mut self, timer: R) {
        self.reconnect = Some(timer);
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.reconnect.is_some()
    }
}

pub struct WatchSlot<S = EventStream, P = Interval, R = Timeout> {
    current: Option<WatchSession<S, P, R>>,
}

impl<S, P, R> Default for WatchSlot<S, P, R> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<S, P, R> WatchSlot<S, P, R> {
    /// Install `session`, dropping the previous one first.
    pub fn replace(&mut self, session: WatchSession<S, P, R>) {
        self.current = None;
        self.current = Some(session);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&WatchSession<S, P, R>> {
        self.current.as_ref()
    }

    /// The active session, but only if it belongs to `generation`.
    pub fn get_mut(&mut self, generation: u64) -> Option<&mut WatchSession<S, P, R>> {
        self.current.as_mut().filter(|s| s.generation == generation)
    }
}
