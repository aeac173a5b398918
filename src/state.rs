use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::canvas::CanvasAdapter;
use crate::constants::{LOG_MAX_ENTRIES, STATUS_IDLE};
use crate::messages::{Command, Message};
use crate::models::{is_terminal_status, Job, LogEntry, OutputPreview};
use crate::network::{GatewayConfig, ReconnectPolicy, WatchSlot};
use crate::registry::NodeRegistry;

/// Bookkeeping for the job currently being watched.  The live resources
/// themselves sit in the executor's `WatchSession` with the same
/// generation.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchTarget {
    pub job_id: String,
    pub generation: u64,
    pub polling: bool,
    pub connected: bool,
    pub reconnect_attempts: u32,
    pub gave_up: bool,
}

impl WatchTarget {
    pub fn new(job_id: &str, generation: u64) -> Self {
        Self {
            job_id: job_id.to_string(),
            generation,
            polling: true,
            connected: false,
            reconnect_attempts: 0,
            gave_up: false,
        }
    }
}

pub struct AppState {
    pub canvas: CanvasAdapter,
    pub gateway: GatewayConfig,
    pub reconnect_policy: ReconnectPolicy,

    // Jobs
    pub jobs: Vec<Job>,
    pub status_text: String,
    pub last_status: Option<String>,
    pub watch: Option<WatchTarget>,
    pub last_generation: u64,
    next_seq: u64,
    pub last_applied_seq: u64,

    // Views
    pub log: Vec<LogEntry>,
    pub output: Option<OutputPreview>,
    output_nonce: u64,
    /// Node type created by a double-click on empty canvas.
    pub palette_type: String,
}

impl AppState {
    pub fn new(gateway: GatewayConfig) -> Self {
        let mut registry = NodeRegistry::new();
        registry.register_all();
        let palette_type = registry
            .types_sorted()
            .first()
            .map(|d| d.type_id.clone())
            .unwrap_or_default();
        Self {
            canvas: CanvasAdapter::new(registry),
            gateway,
            reconnect_policy: ReconnectPolicy::default(),
            jobs: Vec::new(),
            status_text: STATUS_IDLE.to_string(),
            last_status: None,
            watch: None,
            last_generation: 0,
            next_seq: 0,
            last_applied_seq: 0,
            log: Vec::new(),
            output: None,
            output_nonce: 0,
            palette_type,
        }
    }

    pub fn append_log(&mut self, text: impl Into<String>) {
        let seq = self.log.last().map_or(1, |e| e.seq + 1);
        self.log.push(LogEntry {
            seq,
            at_ms: crate::utils::now_ms(),
            text: text.into(),
        });
        if self.log.len() > LOG_MAX_ENTRIES {
            let excess = self.log.len() - LOG_MAX_ENTRIES;
            self.log.drain(..excess);
        }
    }

    /// Local ordering stamp for status writes.
    pub fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// `<ms>-<nonce>`; the nonce makes consecutive tokens differ even within
    /// the same millisecond.
    pub fn next_output_token(&mut self) -> String {
        self.output_nonce += 1;
        format!("{}-{}", crate::utils::now_ms(), self.output_nonce)
    }

    /// The watch target, only if it belongs to `generation`.
    pub fn watch_for(&mut self, generation: u64) -> Option<&mut WatchTarget> {
        self.watch.as_mut().filter(|w| w.generation == generation)
    }

    pub fn last_status_is_terminal(&self) -> bool {
        self.last_status.as_deref().is_some_and(is_terminal_status)
    }

    pub fn job_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }
}

/// Everything the running page owns.  Dropping it closes the event stream
/// and cancels every timer.
pub struct AppContext {
    pub state: RefCell<AppState>,
    pub watch: RefCell<WatchSlot>,
}

impl AppContext {
    pub fn new(state: AppState) -> Self {
        Self {
            state: RefCell::new(state),
            watch: RefCell::new(WatchSlot::default()),
        }
    }
}

// We use thread_local to store the page context
thread_local! {
    static APP: RefCell<Option<Rc<AppContext>>> = const { RefCell::new(None) };
    // Messages that arrived while the state was borrowed, e.g. a `change`
    // fired synchronously by a DOM rebuild.
    static PENDING: RefCell<VecDeque<Message>> = const { RefCell::new(VecDeque::new()) };
}

pub fn init(state: AppState) {
    APP.with(|app| *app.borrow_mut() = Some(Rc::new(AppContext::new(state))));
}

pub fn teardown() {
    let ctx = APP.with(|app| app.borrow_mut().take());
    PENDING.with(|q| q.borrow_mut().clear());
    if let Some(ctx) = ctx {
        ctx.watch.borrow_mut().clear();
        debug_log!("app context torn down");
    }
}

pub fn context() -> Option<Rc<AppContext>> {
    APP.with(|app| app.borrow().clone())
}

/// Run `f` against the state.  `None` before `init()` or after `teardown()`.
pub fn with_state<R>(f: impl FnOnce(&mut AppState) -> R) -> Option<R> {
    let ctx = context()?;
    let mut state = ctx.state.borrow_mut();
    Some(f(&mut state))
}

// Global helper function for dispatching messages.  The state borrow ends
// before any command runs, so executors may dispatch again.  A message that
// arrives while the state is borrowed is queued and runs once the borrow is
// gone.
pub fn dispatch_global_message(msg: Message) {
    let Some(ctx) = context() else {
        debug_log!("dropping message without context: {:?}", msg);
        return;
    };
    let commands = match ctx.state.try_borrow_mut() {
        Ok(mut state) => crate::update::update(&mut state, msg),
        Err(_) => {
            debug_log!("state busy; deferring {:?}", msg);
            PENDING.with(|q| q.borrow_mut().push_back(msg));
            return;
        }
    };
    for cmd in commands {
        crate::command_executors::execute(&ctx, cmd);
    }
    drain_pending();
}

/// Dispatch the messages deferred while the state was busy.
pub fn drain_pending() {
    while let Some(msg) = PENDING.with(|q| q.borrow_mut().pop_front()) {
        dispatch_global_message(msg);
    }
}

/// Run commands that did not come out of `update()`, e.g. the startup
/// fetches.
pub fn execute_commands(commands: Vec<Command>) {
    let Some(ctx) = context() else {
        return;
    };
    for cmd in commands {
        crate::command_executors::execute(&ctx, cmd);
    }
    drain_pending();
}
