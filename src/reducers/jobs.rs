//! Job submission and live-status reducer.
//!
//! Lifecycle per job: `Submitting`, then `Submitted`, then whatever the
//! gateway reports until `completed` or `failed`.  A submission that never
//! reaches the gateway ends as `Offline`.  While a job is watched, a push
//! channel and a poll loop run side by side; both write the same status
//! fields, ordered by a local sequence number.

use crate::canvas::GraphCanvas;
use crate::constants::{JOB_TITLE, LOCAL_JOB_PREFIX, STATUS_IDLE, STATUS_POLLING};
use crate::graph::NodeId;
use crate::messages::{Command, Message};
use crate::models::{GatewayEvent, Job, JobStatus, JobStatusResponse, NodeRunState, OutputPreview, SubmitResponse};
use crate::state::{AppState, WatchTarget};

pub fn update(state: &mut AppState, msg: &Message, cmds: &mut Vec<Command>) -> bool {
    match msg {
        Message::SubmitRequested => submit(state, cmds),
        Message::SubmitSucceeded { local_id, response } => submit_succeeded(state, local_id, response, cmds),
        Message::SubmitFailed { local_id, error } => {
            if let Some(job) = state.job_mut(local_id) {
                job.status = JobStatus::Offline;
            }
            state.append_log(format!("Gateway error: {}", error));
            cmds.push(Command::RenderQueue);
            cmds.push(Command::RenderLog);
        }
        Message::StreamOpened { generation, url } => {
            let Some(watch) = state.watch_for(*generation) else {
                return true;
            };
            watch.connected = true;
            watch.reconnect_attempts = 0;
            state.status_text = format!("Connected to {}", url);
            state.append_log("Event stream connected.");
            cmds.push(Command::RenderStatus);
            cmds.push(Command::RenderLog);
        }
        Message::StreamMessage { generation, data } => {
            if state.watch_for(*generation).is_none() {
                return true;
            }
            let seq = state.next_seq();
            state.append_log(format!("Event: {}", data));
            cmds.push(Command::RenderLog);
            match GatewayEvent::parse(data) {
                Ok(event) => apply_event(state, event, seq, cmds),
                Err(e) => debug_log!("ignoring malformed event: {}", e),
            }
        }
        Message::StreamError { generation } => stream_error(state, *generation, cmds),
        Message::ReconnectStream { generation } => {
            let terminal = state.last_status_is_terminal();
            let Some(watch) = state.watch_for(*generation) else {
                return true;
            };
            if !terminal {
                cmds.push(Command::OpenStream {
                    job_id: watch.job_id.clone(),
                    generation: *generation,
                });
            }
        }
        Message::PollTick { generation } => {
            let job_id = match state.watch_for(*generation) {
                Some(w) if w.polling => w.job_id.clone(),
                _ => return true,
            };
            let seq = state.next_seq();
            cmds.push(Command::FetchJobStatus {
                job_id,
                generation: *generation,
                seq,
            });
        }
        Message::PollCompleted {
            generation,
            seq,
            response,
        } => poll_completed(state, *generation, *seq, response, cmds),
        Message::PollFailed { generation, error } => {
            // Poll failures never change state; the next tick tries again.
            debug_log!("status poll failed (generation {}): {}", generation, error);
        }
        _ => return false,
    }
    true
}

fn submit(state: &mut AppState, cmds: &mut Vec<Command>) {
    let payload = state.canvas.serialize_graph();
    state.canvas.clear_node_states();

    let local_id = format!("{}{}", LOCAL_JOB_PREFIX, uuid::Uuid::new_v4());
    state.jobs.push(Job {
        id: local_id.clone(),
        title: JOB_TITLE.to_string(),
        status: JobStatus::Submitting,
    });

    // Render the optimistic entry before the request goes out.
    cmds.push(Command::RenderQueue);
    cmds.push(Command::Redraw);
    cmds.push(Command::SubmitWorkflow { local_id, payload });
}

fn submit_succeeded(state: &mut AppState, local_id: &str, response: &SubmitResponse, cmds: &mut Vec<Command>) {
    let job_id = response.job_id.clone().filter(|id| !id.is_empty());
    if let Some(job) = state.job_mut(local_id) {
        if let Some(id) = &job_id {
            job.id = id.clone();
        }
        job.status = JobStatus::Submitted(job_id.clone().unwrap_or_default());
    }
    let base = state.gateway.base_url().to_string();
    state.append_log(format!("Workflow sent to gateway at {}.", base));
    cmds.push(Command::RenderQueue);
    cmds.push(Command::RenderLog);

    if let Some(id) = job_id {
        start_watch(state, &id, cmds);
    }
}

/// Tear down the previous watch and start a fresh one for `job_id`.
pub fn start_watch(state: &mut AppState, job_id: &str, cmds: &mut Vec<Command>) {
    cmds.push(Command::StopWatch);
    state.last_generation += 1;
    let generation = state.last_generation;
    state.watch = Some(WatchTarget::new(job_id, generation));
    state.last_status = None;

    cmds.push(Command::StartWatch {
        job_id: job_id.to_string(),
        generation,
    });
    // First status check right away; the interval takes over after that.
    cmds.push(Command::SendMessage(Message::PollTick { generation }));
}

fn set_status(state: &mut AppState, status: &str, seq: u64, cmds: &mut Vec<Command>) {
    state.status_text = status.to_string();
    state.last_status = Some(status.to_string());
    state.last_applied_seq = state.last_applied_seq.max(seq);
    cmds.push(Command::RenderStatus);
}

fn apply_event(state: &mut AppState, event: GatewayEvent, seq: u64, cmds: &mut Vec<Command>) {
    if let Some(s) = &event.state {
        set_status(state, s, seq, cmds);
    }

    if let Some(nodes) = &event.nodes {
        let mut changed = false;
        for node in nodes {
            // Nodes deleted since submission are skipped.
            let Ok(node_id) = node.node_id.parse::<NodeId>() else {
                continue;
            };
            changed |= state
                .canvas
                .set_node_state(node_id, NodeRunState::parse(&node.state));
        }
        if changed {
            cmds.push(Command::Redraw);
        }
    }

    if let Some(workflow_id) = &event.workflow_id {
        if event.state.as_deref() == Some("completed") {
            show_output(state, workflow_id, cmds);
        }
        if let Some(s) = &event.state {
            if let Some(job) = state.job_mut(workflow_id) {
                job.status = JobStatus::Gateway(s.clone());
                cmds.push(Command::RenderQueue);
            }
        }
    }
}

fn poll_completed(
    state: &mut AppState,
    generation: u64,
    seq: u64,
    response: &JobStatusResponse,
    cmds: &mut Vec<Command>,
) {
    let job_id = match state.watch_for(generation) {
        Some(w) if w.polling => w.job_id.clone(),
        _ => return,
    };
    if seq < state.last_applied_seq {
        debug_log!("discarding stale poll response (seq {} < {})", seq, state.last_applied_seq);
        return;
    }

    let status = response
        .status
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "queued".to_string());
    let changed = state.last_status.as_deref() != Some(status.as_str());
    set_status(state, &status, seq, cmds);
    if let Some(job) = state.job_mut(&job_id) {
        job.status = JobStatus::Gateway(status.clone());
        cmds.push(Command::RenderQueue);
    }
    if changed {
        state.append_log(format!("Job {} status: {}", job_id, status));
        cmds.push(Command::RenderLog);
    }

    match status.as_str() {
        "completed" => {
            show_output(state, &job_id, cmds);
            stop_polling(state, generation, cmds);
        }
        "failed" => stop_polling(state, generation, cmds),
        _ => {}
    }
}

fn stop_polling(state: &mut AppState, generation: u64, cmds: &mut Vec<Command>) {
    if let Some(watch) = state.watch_for(generation) {
        watch.polling = false;
        cmds.push(Command::StopPolling { generation });
    }
}

fn stream_error(state: &mut AppState, generation: u64, cmds: &mut Vec<Command>) {
    let terminal = state.last_status_is_terminal();
    let policy = state.reconnect_policy;
    let Some(watch) = state.watch_for(generation) else {
        return;
    };
    let was_connected = std::mem::replace(&mut watch.connected, false);

    // The browser would retry on its own; we close and retry on our schedule.
    cmds.push(Command::CloseStream { generation });

    let mut gave_up_now = false;
    if !terminal && !watch.gave_up {
        match policy.delay_for(watch.reconnect_attempts) {
            Some(delay_ms) => {
                watch.reconnect_attempts += 1;
                cmds.push(Command::ScheduleReconnect { generation, delay_ms });
            }
            None => {
                watch.gave_up = true;
                gave_up_now = true;
            }
        }
    }

    if was_connected {
        state.status_text = if terminal { STATUS_IDLE } else { STATUS_POLLING }.to_string();
        cmds.push(Command::RenderStatus);
    }
    if gave_up_now {
        state.append_log(format!(
            "Event stream gave up after {} attempts",
            policy.max_attempts
        ));
        cmds.push(Command::RenderLog);
    }
}

/// Point the output view at `job_id` with a fresh cache-busting token.
pub fn show_output(state: &mut AppState, job_id: &str, cmds: &mut Vec<Command>) {
    let token = state.next_output_token();
    state.output = Some(OutputPreview {
        job_id: job_id.to_string(),
        url: state.gateway.output_url(job_id, &token),
        caption: format!("Job {} output", job_id),
    });
    cmds.push(Command::RenderOutput);
}

/// Edit-tracking hook: an edit after a failed run wipes the overlays and
/// returns the status line to idle.
pub fn note_graph_edit(state: &mut AppState, cmds: &mut Vec<Command>) {
    if state.last_status.as_deref() != Some("failed") {
        return;
    }
    state.canvas.clear_node_states();
    state.last_status = None;
    state.status_text = STATUS_IDLE.to_string();
    state.append_log("Graph edited after failure; run state cleared.");
    cmds.push(Command::Redraw);
    cmds.push(Command::RenderStatus);
    cmds.push(Command::RenderLog);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::GatewayConfig;

    fn state() -> AppState {
        AppState::new(GatewayConfig::from_url("http://gw"))
    }

    fn submit_and_accept(state: &mut AppState, job_id: &str) -> (Vec<Command>, u64) {
        let mut cmds = Vec::new();
        update(state, &Message::SubmitRequested, &mut cmds);
        let local_id = state.jobs.last().unwrap().id.clone();
        let mut cmds = Vec::new();
        update(
            state,
            &Message::SubmitSucceeded {
                local_id,
                response: SubmitResponse {
                    job_id: Some(job_id.into()),
                    status: Some("queued".into()),
                },
            },
            &mut cmds,
        );
        let generation = state.watch.as_ref().unwrap().generation;
        (cmds, generation)
    }

    #[test]
    fn submit_appends_exactly_one_job_before_the_request() {
        let mut s = state();
        let mut cmds = Vec::new();
        update(&mut s, &Message::SubmitRequested, &mut cmds);

        assert_eq!(s.jobs.len(), 1);
        assert_eq!(s.jobs[0].status, JobStatus::Submitting);
        assert!(s.jobs[0].id.starts_with("local-"));
        let render = cmds.iter().position(|c| *c == Command::RenderQueue).unwrap();
        let submit = cmds
            .iter()
            .position(|c| matches!(c, Command::SubmitWorkflow { .. }))
            .unwrap();
        assert!(render < submit);
    }

    #[test]
    fn accepted_submission_adopts_id_and_watches() {
        let mut s = state();
        let (cmds, generation) = submit_and_accept(&mut s, "abc");
        assert_eq!(s.jobs[0].id, "abc");
        assert_eq!(s.jobs[0].status.to_string(), "submitted abc");
        assert!(cmds.contains(&Command::StartWatch {
            job_id: "abc".into(),
            generation
        }));
        assert!(s.log.iter().any(|e| e.text == "Workflow sent to gateway at http://gw."));
    }

    #[test]
    fn accepted_without_id_does_not_watch() {
        let mut s = state();
        let mut cmds = Vec::new();
        update(&mut s, &Message::SubmitRequested, &mut cmds);
        let local_id = s.jobs[0].id.clone();
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::SubmitSucceeded {
                local_id,
                response: SubmitResponse::default(),
            },
            &mut cmds,
        );
        assert_eq!(s.jobs[0].status.to_string(), "submitted");
        assert!(s.watch.is_none());
        assert!(!cmds.iter().any(|c| matches!(c, Command::StartWatch { .. })));
    }

    #[test]
    fn failed_submission_goes_offline_without_watch() {
        let mut s = state();
        let mut cmds = Vec::new();
        update(&mut s, &Message::SubmitRequested, &mut cmds);
        let local_id = s.jobs[0].id.clone();
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::SubmitFailed {
                local_id,
                error: "Failed to fetch".into(),
            },
            &mut cmds,
        );
        assert_eq!(s.jobs[0].status.to_string(), "queued (offline)");
        assert!(s.watch.is_none());
        assert!(cmds.contains(&Command::RenderQueue));
        assert!(!cmds.iter().any(|c| matches!(c, Command::StartWatch { .. } | Command::SubmitWorkflow { .. })));
        assert_eq!(s.log.last().unwrap().text, "Gateway error: Failed to fetch");
    }

    #[test]
    fn new_watch_replaces_the_old_one() {
        let mut s = state();
        let (_, first) = submit_and_accept(&mut s, "A");
        let (cmds, second) = submit_and_accept(&mut s, "B");
        assert!(second > first);
        let stop = cmds.iter().position(|c| *c == Command::StopWatch).unwrap();
        let start = cmds
            .iter()
            .position(|c| matches!(c, Command::StartWatch { .. }))
            .unwrap();
        assert!(stop < start);
        assert_eq!(s.watch.as_ref().unwrap().job_id, "B");

        // Late traffic from A's session is ignored.
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::StreamMessage {
                generation: first,
                data: r#"{"state":"completed","workflow_id":"A"}"#.into(),
            },
            &mut cmds,
        );
        assert!(cmds.is_empty());
        assert!(s.output.is_none());
    }

    #[test]
    fn completed_event_shows_output_and_updates_job() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::StreamMessage {
                generation,
                data: r#"{"state":"completed","workflow_id":"abc"}"#.into(),
            },
            &mut cmds,
        );
        let output = s.output.clone().unwrap();
        assert!(output.url.starts_with("http://gw/v1/jobs/abc/output?ts="));
        assert_eq!(output.caption, "Job abc output");
        assert_eq!(s.jobs[0].status.to_string(), "completed");
        assert_eq!(s.status_text, "completed");
        assert!(s.log.iter().any(|e| e.text.starts_with("Event: {")));
    }

    #[test]
    fn output_token_changes_for_the_same_job() {
        let mut s = state();
        let mut cmds = Vec::new();
        show_output(&mut s, "J", &mut cmds);
        let first = s.output.clone().unwrap().url;
        show_output(&mut s, "J", &mut cmds);
        let second = s.output.clone().unwrap().url;
        assert_ne!(first, second);
        assert!(second.contains("/v1/jobs/J/output"));
    }

    #[test]
    fn node_updates_skip_missing_nodes() {
        let mut s = state();
        let id = s.canvas.add_node("KSampler", [0.0, 0.0]).unwrap();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let mut cmds = Vec::new();
        let data = format!(
            r#"{{"state":"running","nodes":[{{"node_id":"{}","state":"running"}},{{"node_id":"999","state":"failed"}}]}}"#,
            id
        );
        update(&mut s, &Message::StreamMessage { generation, data }, &mut cmds);
        assert_eq!(s.canvas.node_states.len(), 1);
        assert_eq!(s.canvas.node_states[&id], NodeRunState::Running);
        assert!(cmds.contains(&Command::Redraw));
    }

    #[test]
    fn malformed_events_are_logged_and_swallowed() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let before = s.status_text.clone();
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::StreamMessage {
                generation,
                data: "not json".into(),
            },
            &mut cmds,
        );
        assert_eq!(s.status_text, before);
        assert_eq!(s.log.last().unwrap().text, "Event: not json");
        assert!(s.watch.is_some());
    }

    #[test]
    fn poll_failed_stops_polling_without_output() {
        let mut s = state();
        let id = s.canvas.add_node("VAEDecode", [0.0, 0.0]).unwrap();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        s.canvas.set_node_state(id, Some(NodeRunState::Running));

        let mut cmds = Vec::new();
        update(&mut s, &Message::PollTick { generation }, &mut cmds);
        let Some(Command::FetchJobStatus { seq, .. }) = cmds.pop() else {
            panic!("expected a status fetch");
        };
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::PollCompleted {
                generation,
                seq,
                response: JobStatusResponse {
                    status: Some("failed".into()),
                    ..Default::default()
                },
            },
            &mut cmds,
        );
        assert!(cmds.contains(&Command::StopPolling { generation }));
        assert!(s.output.is_none());
        assert!(!s.watch.as_ref().unwrap().polling);
        assert_eq!(s.canvas.node_states[&id], NodeRunState::Running);

        // Ticks after a terminal status do nothing.
        let mut cmds = Vec::new();
        update(&mut s, &Message::PollTick { generation }, &mut cmds);
        assert!(cmds.is_empty());
    }

    #[test]
    fn poll_completed_shows_output_and_stops() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let seq = s.next_seq();
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::PollCompleted {
                generation,
                seq,
                response: JobStatusResponse {
                    status: Some("completed".into()),
                    ..Default::default()
                },
            },
            &mut cmds,
        );
        assert_eq!(s.output.as_ref().unwrap().job_id, "abc");
        assert!(cmds.contains(&Command::StopPolling { generation }));
        assert_eq!(s.jobs[0].status.to_string(), "completed");
    }

    #[test]
    fn stale_poll_does_not_overwrite_newer_push() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        // Poll issued first...
        let poll_seq = s.next_seq();
        // ...then a push event arrives.
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::StreamMessage {
                generation,
                data: r#"{"state":"running"}"#.into(),
            },
            &mut cmds,
        );
        // The older poll response lands last.
        update(
            &mut s,
            &Message::PollCompleted {
                generation,
                seq: poll_seq,
                response: JobStatusResponse {
                    status: Some("queued".into()),
                    ..Default::default()
                },
            },
            &mut cmds,
        );
        assert_eq!(s.status_text, "running");
        assert_eq!(s.last_status.as_deref(), Some("running"));
    }

    #[test]
    fn poll_failures_change_nothing() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let status = s.status_text.clone();
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::PollFailed {
                generation,
                error: "HTTP 502".into(),
            },
            &mut cmds,
        );
        assert!(cmds.is_empty());
        assert_eq!(s.status_text, status);
        assert!(s.watch.as_ref().unwrap().polling);
    }

    #[test]
    fn stream_open_and_disconnect() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::StreamOpened {
                generation,
                url: "http://gw/v1/events?id=abc".into(),
            },
            &mut cmds,
        );
        assert_eq!(s.status_text, "Connected to http://gw/v1/events?id=abc");
        assert_eq!(s.log.last().unwrap().text, "Event stream connected.");

        let mut cmds = Vec::new();
        update(&mut s, &Message::StreamError { generation }, &mut cmds);
        assert_eq!(s.status_text, "Polling for status");
        assert!(cmds.contains(&Command::ScheduleReconnect {
            generation,
            delay_ms: 1000
        }));
    }

    #[test]
    fn disconnect_after_terminal_status_goes_idle_without_reconnect() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let mut cmds = Vec::new();
        update(
            &mut s,
            &Message::StreamOpened {
                generation,
                url: "u".into(),
            },
            &mut cmds,
        );
        update(
            &mut s,
            &Message::StreamMessage {
                generation,
                data: r#"{"state":"completed"}"#.into(),
            },
            &mut cmds,
        );
        let mut cmds = Vec::new();
        update(&mut s, &Message::StreamError { generation }, &mut cmds);
        assert_eq!(s.status_text, "Idle");
        assert!(!cmds.iter().any(|c| matches!(c, Command::ScheduleReconnect { .. })));
    }

    #[test]
    fn reconnects_back_off_then_give_up() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let mut delays = Vec::new();
        for _ in 0..7 {
            let mut cmds = Vec::new();
            update(&mut s, &Message::StreamError { generation }, &mut cmds);
            delays.extend(cmds.iter().filter_map(|c| match c {
                Command::ScheduleReconnect { delay_ms, .. } => Some(*delay_ms),
                _ => None,
            }));
        }
        assert_eq!(delays, [1000, 2000, 4000, 8000, 16000]);
        let gave_up: Vec<_> = s
            .log
            .iter()
            .filter(|e| e.text == "Event stream gave up after 5 attempts")
            .collect();
        assert_eq!(gave_up.len(), 1);
        // Polling stays authoritative.
        assert!(s.watch.as_ref().unwrap().polling);
    }

    #[test]
    fn reconnect_reopens_stream_for_current_generation_only() {
        let mut s = state();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let mut cmds = Vec::new();
        update(&mut s, &Message::ReconnectStream { generation }, &mut cmds);
        assert_eq!(
            cmds,
            vec![Command::OpenStream {
                job_id: "abc".into(),
                generation
            }]
        );
        let mut cmds = Vec::new();
        update(&mut s, &Message::ReconnectStream { generation: generation + 5 }, &mut cmds);
        assert!(cmds.is_empty());
    }

    #[test]
    fn edit_after_failure_resets_overlays_and_status() {
        let mut s = state();
        let id = s.canvas.add_node("KSampler", [0.0, 0.0]).unwrap();
        let (_, generation) = submit_and_accept(&mut s, "abc");
        let mut cmds = Vec::new();
        let data = format!(
            r#"{{"state":"failed","nodes":[{{"node_id":{},"state":"failed"}}]}}"#,
            id
        );
        update(&mut s, &Message::StreamMessage { generation, data }, &mut cmds);
        assert_eq!(s.status_text, "failed");
        assert_eq!(s.canvas.node_states.len(), 1);

        let mut cmds = Vec::new();
        note_graph_edit(&mut s, &mut cmds);
        assert!(s.canvas.node_states.is_empty());
        assert_eq!(s.status_text, "Idle");
        assert!(cmds.contains(&Command::Redraw));
    }

    #[test]
    fn edits_without_failure_keep_overlays() {
        let mut s = state();
        let id = s.canvas.add_node("KSampler", [0.0, 0.0]).unwrap();
        s.canvas.set_node_state(id, Some(NodeRunState::Running));
        s.last_status = Some("running".into());
        let mut cmds = Vec::new();
        note_graph_edit(&mut s, &mut cmds);
        assert_eq!(s.canvas.node_states.len(), 1);
        assert!(cmds.is_empty());
    }

    #[test]
    fn submitting_clears_overlays() {
        let mut s = state();
        let id = s.canvas.add_node("KSampler", [0.0, 0.0]).unwrap();
        s.canvas.set_node_state(id, Some(NodeRunState::Completed));
        let mut cmds = Vec::new();
        update(&mut s, &Message::SubmitRequested, &mut cmds);
        assert!(s.canvas.node_states.is_empty());
    }
}
