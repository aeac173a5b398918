// Gateway defaults
pub const DEFAULT_GATEWAY_PORT: u16 = 8084;
pub const GATEWAY_OVERRIDE_GLOBAL: &str = "COMFY_API_BASE";
pub const DEFAULT_WORKFLOW_PATH: &str = "workflows/default.json";

// Job lifecycle
pub const POLL_INTERVAL_MS: u32 = 3000;
pub const STREAM_INITIAL_BACKOFF_MS: u32 = 1000;
pub const STREAM_MAX_BACKOFF_MS: u32 = 30000;
pub const STREAM_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const QUEUE_VISIBLE_JOBS: usize = 3;
// Oldest log lines are dropped past this many, in state and on screen.
pub const LOG_MAX_ENTRIES: usize = 500;
pub const JOB_TITLE: &str = "Workflow submission";
pub const LOCAL_JOB_PREFIX: &str = "local-";

// Status line texts
pub const STATUS_IDLE: &str = "Idle";
pub const STATUS_POLLING: &str = "Polling for status";

// Node geometry (node-local coordinates, y = 0 is the top of the body)
pub const NODE_TITLE_HEIGHT: f64 = 30.0;
pub const NODE_SLOT_HEIGHT: f64 = 20.0;
pub const NODE_SLOT_RADIUS: f64 = 5.0;
pub const NODE_SLOT_HIT_RADIUS: f64 = 10.0;
pub const NODE_CORNER_RADIUS: f64 = 8.0;
pub const NODE_MIN_WIDTH: f64 = 140.0;
pub const WIDGET_HEIGHT: f64 = 20.0;
pub const WIDGET_MULTILINE_HEIGHT: f64 = 60.0;
pub const WIDGET_GAP: f64 = 4.0;
pub const WIDGET_SIDE_MARGIN: f64 = 15.0;
pub const WIDGET_ARROW_WIDTH: f64 = 16.0;
pub const WIDGET_BOTTOM_PADDING: f64 = 8.0;

// Viewport
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;

// Prompt dialog
pub const DIALOG_Z_INDEX: i32 = 10000;

// Canvas colors
pub const CANVAS_BACKGROUND_COLOR: &str = "#1e1e24";
pub const CANVAS_GRID_COLOR: &str = "rgba(255, 255, 255, 0.04)";
pub const NODE_BODY_COLOR: &str = "#353541";
pub const NODE_TITLE_COLOR: &str = "#2a2a33";
pub const NODE_TEXT_COLOR: &str = "#e6e6ea";
pub const NODE_BORDER_DEFAULT: &str = "#4b4b58";
pub const NODE_BORDER_SELECTED: &str = "#f0f0f5";
pub const WIDGET_BG_COLOR: &str = "#24242c";
pub const WIDGET_TEXT_COLOR: &str = "#c8c8d0";
pub const WIDGET_LABEL_COLOR: &str = "#8a8a96";
pub const LINK_MISMATCH_COLOR: &str = "#ff4d4f";
pub const SHADOW_COLOR: &str = "rgba(0, 0, 0, 0.35)";

// Run-state overlay colors
pub const STATE_RUNNING_COLOR: &str = "#d39e2a";
pub const STATE_FAILED_COLOR: &str = "#c0392b";
pub const STATE_COMPLETED_COLOR: &str = "#2e8b57";
pub const STATE_OTHER_COLOR: &str = "#5d6d7e";

/// Color for a port / link type tag.  Unknown tags fall back to grey.
pub fn type_color(type_tag: &str) -> &'static str {
    match type_tag {
        "MODEL" => "#b39ddb",
        "CLIP" => "#ffd54f",
        "VAE" => "#ef5350",
        "CONDITIONING" => "#ffa931",
        "LATENT" => "#ff9cf9",
        "IMAGE" => "#64b5f6",
        _ => "#9e9e9e",
    }
}

// Page element ids
pub const CANVAS_ID: &str = "graph";
pub const STATUS_ID: &str = "status-text";
pub const QUEUE_LIST_ID: &str = "queue-list";
pub const LOG_ID: &str = "log-output";
pub const GATEWAY_LABEL_ID: &str = "gateway-target";
pub const OUTPUT_IMAGE_ID: &str = "output-preview";
pub const OUTPUT_META_ID: &str = "output-meta";
pub const INSPECTOR_ID: &str = "inspector";
pub const PALETTE_ID: &str = "node-palette";
pub const QUEUE_BUTTON_ID: &str = "queue-btn";
pub const RESET_BUTTON_ID: &str = "reset-btn";
