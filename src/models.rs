use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a submitted job.  The gateway vocabulary is open, so
/// anything it reports that we do not model explicitly lands in `Gateway`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Submitting,
    Submitted(String),
    Offline,
    Gateway(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            JobStatus::Offline => true,
            JobStatus::Gateway(s) => is_terminal_status(s),
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Submitting => write!(f, "submitting"),
            JobStatus::Submitted(id) if id.is_empty() => write!(f, "submitted"),
            JobStatus::Submitted(id) => write!(f, "submitted {}", id),
            JobStatus::Offline => write!(f, "queued (offline)"),
            JobStatus::Gateway(s) => write!(f, "{}", s),
        }
    }
}

/// `completed` and `failed` end a job; everything else may still change.
pub fn is_terminal_status(status: &str) -> bool {
    matches!(status, "completed" | "failed")
}

/// Job represents one submission tracked by the queue view.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub status: JobStatus,
}

/// Transient per-node overlay reported by the gateway while a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRunState {
    Running,
    Failed,
    Completed,
    Other(String),
}

impl NodeRunState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "" | "idle" => None,
            "running" => Some(NodeRunState::Running),
            "failed" => Some(NodeRunState::Failed),
            "completed" => Some(NodeRunState::Completed),
            other => Some(NodeRunState::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeRunState::Running => "running",
            NodeRunState::Failed => "failed",
            NodeRunState::Completed => "completed",
            NodeRunState::Other(s) => s,
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway wire types
// ---------------------------------------------------------------------------

/// Response of `POST /v1/workflows`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SubmitResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `GET /v1/jobs/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct JobStatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Response of `GET /v1/checkpoints`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CheckpointsResponse {
    #[serde(default)]
    pub checkpoints: Vec<String>,
}

/// One per-node entry of an event's `nodes` array.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeStateUpdate {
    #[serde(deserialize_with = "de_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub state: String,
}

/// A push-channel payload.  Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct GatewayEvent {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub nodes: Option<Vec<NodeStateUpdate>>,
    #[serde(default)]
    pub workflow_id: Option<String>,
}

impl GatewayEvent {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// Node ids arrive as numbers from graph-aware emitters and as strings from
// the orchestrator; accept both.
fn de_node_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "node_id must be a string or number, got {}",
            other
        ))),
    }
}

// ---------------------------------------------------------------------------
// View models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub seq: u64,
    pub at_ms: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputPreview {
    pub job_id: String,
    pub url: String,
    pub caption: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_queue_labels() {
        assert_eq!(JobStatus::Submitted("abc".into()).to_string(), "submitted abc");
        assert_eq!(JobStatus::Submitted(String::new()).to_string(), "submitted");
        assert_eq!(JobStatus::Offline.to_string(), "queued (offline)");
        assert_eq!(JobStatus::Gateway("running".into()).to_string(), "running");
    }

    #[test]
    fn event_accepts_numeric_and_string_node_ids() {
        let ev = GatewayEvent::parse(
            r#"{"state":"running","nodes":[{"node_id":3,"state":"running"},{"node_id":"4","state":"completed"}]}"#,
        )
        .unwrap();
        let nodes = ev.nodes.unwrap();
        assert_eq!(nodes[0].node_id, "3");
        assert_eq!(nodes[1].node_id, "4");
        assert_eq!(ev.state.as_deref(), Some("running"));
        assert!(ev.workflow_id.is_none());
    }

    #[test]
    fn node_run_state_parsing() {
        assert_eq!(NodeRunState::parse("running"), Some(NodeRunState::Running));
        assert_eq!(NodeRunState::parse("idle"), None);
        assert_eq!(
            NodeRunState::parse("cached"),
            Some(NodeRunState::Other("cached".into()))
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal_status("completed"));
        assert!(is_terminal_status("failed"));
        assert!(!is_terminal_status("running"));
        assert!(JobStatus::Offline.is_terminal());
    }
}
