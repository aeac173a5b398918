// frontend/src/messages.rs
//
// Every user action, network completion and timer tick enters the app as a
// `Message`.  `update()` answers with `Command`s that the executor runs.

use serde_json::Value;

use crate::graph::NodeId;
use crate::models::{JobStatusResponse, SubmitResponse};

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Workflow asset
    WorkflowLoaded(Value),
    WorkflowLoadFailed(String),
    /// Reset button: reload the default workflow.
    ResetWorkflow,
    /// A host page replaced the graph through the JS entry point.
    GraphReplaced,

    // Checkpoint discovery
    CheckpointsLoaded(Vec<String>),
    CheckpointsFailed(String),

    // Canvas input, in CSS pixels relative to the canvas element
    CanvasPointerDown { x: f64, y: f64 },
    CanvasPointerMove { x: f64, y: f64 },
    CanvasPointerUp { x: f64, y: f64 },
    CanvasWheel { x: f64, y: f64, delta_y: f64 },
    CanvasDoubleClick { x: f64, y: f64 },
    CanvasResized { width: f64, height: f64, dpr: f64 },
    DeleteSelected,
    PaletteTypeChosen(String),

    // Widget edits
    WidgetEdited {
        node_id: NodeId,
        widget_index: usize,
        raw: String,
    },
    PromptClosed {
        node_id: NodeId,
        widget_index: usize,
        value: Option<String>,
    },

    // Job submission
    SubmitRequested,
    SubmitSucceeded {
        local_id: String,
        response: SubmitResponse,
    },
    SubmitFailed {
        local_id: String,
        error: String,
    },

    // Push channel
    StreamOpened { generation: u64, url: String },
    StreamMessage { generation: u64, data: String },
    StreamError { generation: u64 },
    ReconnectStream { generation: u64 },

    // Poll loop
    PollTick { generation: u64 },
    PollCompleted {
        generation: u64,
        seq: u64,
        response: JobStatusResponse,
    },
    PollFailed { generation: u64, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Chain another message to be processed
    SendMessage(Message),

    FetchDefaultWorkflow,
    FetchCheckpoints,
    SubmitWorkflow {
        local_id: String,
        payload: Value,
    },

    /// Drop the current watch session (stream, poll timer, reconnect timer).
    StopWatch,
    /// Create a session for `job_id`: open the stream and start polling.
    StartWatch { job_id: String, generation: u64 },
    OpenStream { job_id: String, generation: u64 },
    CloseStream { generation: u64 },
    ScheduleReconnect { generation: u64, delay_ms: u32 },
    StopPolling { generation: u64 },
    FetchJobStatus {
        job_id: String,
        generation: u64,
        seq: u64,
    },

    OpenPrompt { node_id: NodeId, widget_index: usize },

    // View refreshes
    Redraw,
    RenderInspector,
    RenderQueue,
    RenderLog,
    RenderOutput,
    RenderStatus,
}
