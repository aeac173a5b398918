//! Side-effect runners for the `Command`s produced by `update()`.
//!
//! Nothing here holds a `RefCell` borrow across an await or across a
//! re-dispatch: async completions come back as messages through
//! `dispatch_global_message`.

use std::rc::Rc;

use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

use crate::canvas::dialog::{self, PromptRequest};
use crate::canvas::GraphCanvas;
use crate::components::inspector;
use crate::constants::POLL_INTERVAL_MS;
use crate::dom_utils;
use crate::graph::NodeId;
use crate::messages::{Command, Message};
use crate::network::api_client::fetch_default_workflow;
use crate::network::{EventStream, GatewayClient, WatchSession};
use crate::state::{dispatch_global_message, AppContext};
use crate::views::{self, Panel};

pub fn execute(ctx: &Rc<AppContext>, cmd: Command) {
    match cmd {
        Command::SendMessage(msg) => dispatch_global_message(msg),

        Command::FetchDefaultWorkflow
        | Command::FetchCheckpoints
        | Command::SubmitWorkflow { .. }
        | Command::FetchJobStatus { .. } => execute_fetch_command(ctx, cmd),

        Command::StopWatch
        | Command::StartWatch { .. }
        | Command::OpenStream { .. }
        | Command::CloseStream { .. }
        | Command::ScheduleReconnect { .. }
        | Command::StopPolling { .. } => execute_watch_command(ctx, cmd),

        Command::OpenPrompt {
            node_id,
            widget_index,
        } => open_prompt(ctx, node_id, widget_index),

        Command::Redraw => ctx.state.borrow().canvas.force_redraw(),
        Command::RenderInspector => render(ctx, Panel::Inspector),
        Command::RenderQueue => render(ctx, Panel::Queue),
        Command::RenderLog => render(ctx, Panel::Log),
        Command::RenderOutput => render(ctx, Panel::Output),
        Command::RenderStatus => render(ctx, Panel::Status),
    }
}

fn gateway_client(ctx: &AppContext) -> GatewayClient {
    GatewayClient::new(ctx.state.borrow().gateway.clone())
}

pub fn execute_fetch_command(ctx: &Rc<AppContext>, cmd: Command) {
    match cmd {
        Command::FetchDefaultWorkflow => {
            spawn_local(async move {
                match fetch_default_workflow().await {
                    Ok(json) => dispatch_global_message(Message::WorkflowLoaded(json)),
                    Err(e) => dispatch_global_message(Message::WorkflowLoadFailed(e.to_string())),
                }
            });
        }
        Command::FetchCheckpoints => {
            let client = gateway_client(ctx);
            spawn_local(async move {
                match client.checkpoints().await {
                    Ok(names) => dispatch_global_message(Message::CheckpointsLoaded(names)),
                    Err(e) => dispatch_global_message(Message::CheckpointsFailed(e.to_string())),
                }
            });
        }
        Command::SubmitWorkflow { local_id, payload } => {
            let client = gateway_client(ctx);
            spawn_local(async move {
                match client.submit_workflow(&payload).await {
                    Ok(response) => dispatch_global_message(Message::SubmitSucceeded { local_id, response }),
                    Err(e) => {
                        warn_log!("submission failed: {}", e);
                        dispatch_global_message(Message::SubmitFailed {
                            local_id,
                            error: e.to_string(),
                        })
                    }
                }
            });
        }
        Command::FetchJobStatus {
            job_id,
            generation,
            seq,
        } => {
            let client = gateway_client(ctx);
            spawn_local(async move {
                match client.job_status(&job_id).await {
                    Ok(response) => dispatch_global_message(Message::PollCompleted {
                        generation,
                        seq,
                        response,
                    }),
                    Err(e) => dispatch_global_message(Message::PollFailed {
                        generation,
                        error: e.to_string(),
                    }),
                }
            });
        }
        _ => {}
    }
}

/// Open the push channel for `job_id`; its callbacks re-enter as messages
/// tagged with `generation`.
fn open_stream(ctx: &AppContext, job_id: &str, generation: u64) -> Result<EventStream, JsValue> {
    let url = ctx.state.borrow().gateway.events_url(Some(job_id));
    let opened_url = url.clone();
    EventStream::open(
        &url,
        move || {
            dispatch_global_message(Message::StreamOpened {
                generation,
                url: opened_url.clone(),
            })
        },
        move |data| dispatch_global_message(Message::StreamMessage { generation, data }),
        move || dispatch_global_message(Message::StreamError { generation }),
    )
}

pub fn execute_watch_command(ctx: &Rc<AppContext>, cmd: Command) {
    match cmd {
        Command::StopWatch => ctx.watch.borrow_mut().clear(),
        Command::StartWatch { job_id, generation } => {
            let mut session = WatchSession::new(&job_id, generation);
            let stream_failed = match open_stream(ctx, &job_id, generation) {
                Ok(stream) => {
                    session.set_stream(stream);
                    false
                }
                Err(e) => {
                    warn_log!("event stream unavailable: {:?}", e);
                    true
                }
            };
            session.set_poll(Interval::new(POLL_INTERVAL_MS, move || {
                dispatch_global_message(Message::PollTick { generation })
            }));
            ctx.watch.borrow_mut().replace(session);
            debug_log!("watching job {} (generation {})", job_id, generation);

            if stream_failed {
                dispatch_global_message(Message::StreamError { generation });
            }
        }
        Command::OpenStream { job_id, generation } => {
            if ctx.watch.borrow_mut().get_mut(generation).is_none() {
                return;
            }
            match open_stream(ctx, &job_id, generation) {
                Ok(stream) => {
                    if let Some(session) = ctx.watch.borrow_mut().get_mut(generation) {
                        session.set_stream(stream);
                    }
                }
                Err(e) => {
                    warn_log!("event stream reopen failed: {:?}", e);
                    dispatch_global_message(Message::StreamError { generation });
                }
            }
        }
        Command::CloseStream { generation } => {
            if let Some(session) = ctx.watch.borrow_mut().get_mut(generation) {
                session.close_stream();
            }
        }
        Command::ScheduleReconnect { generation, delay_ms } => {
            if let Some(session) = ctx.watch.borrow_mut().get_mut(generation) {
                debug_log!("reconnecting event stream in {}ms", delay_ms);
                session.schedule_reconnect(Timeout::new(delay_ms, move || {
                    dispatch_global_message(Message::ReconnectStream { generation })
                }));
            }
        }
        Command::StopPolling { generation } => {
            if let Some(session) = ctx.watch.borrow_mut().get_mut(generation) {
                session.stop_polling();
            }
        }
        _ => {}
    }
}

fn open_prompt(ctx: &AppContext, node_id: NodeId, widget_index: usize) {
    let closed = move |value: Option<String>| {
        dispatch_global_message(Message::PromptClosed {
            node_id,
            widget_index,
            value,
        })
    };

    let request: Option<PromptRequest> = {
        let state = ctx.state.borrow();
        let origin = state
            .canvas
            .surface()
            .map(|s| {
                let rect = s.canvas.get_bounding_client_rect();
                [rect.left(), rect.top()]
            })
            .unwrap_or([0.0, 0.0]);
        state.canvas.prompt_request(node_id, widget_index, origin)
    };

    let opened = match (request, dom_utils::document()) {
        (Some(request), Some(document)) => dialog::open_prompt(&document, &request, closed),
        _ => Err(JsValue::from_str("prompt target is gone")),
    };
    if let Err(e) = opened {
        // Unlatch the canvas even though nothing was shown.
        debug_log!("prompt not shown: {:?}", e);
        dispatch_global_message(Message::PromptClosed {
            node_id,
            widget_index,
            value: None,
        });
    }
}

fn render(ctx: &AppContext, panel: Panel) {
    let Some(document) = dom_utils::document() else {
        return;
    };
    let result = match panel {
        // Rebuilding the form can blur a focused control, whose `change`
        // dispatches synchronously; render from a copy with no borrow held.
        Panel::Inspector => {
            let view = inspector::snapshot(&ctx.state.borrow());
            inspector::render(&document, view.as_ref())
        }
        _ => views::render_panel(panel, &ctx.state.borrow(), &document),
    };
    if let Err(e) = result {
        error_log!("failed to render {:?}: {:?}", panel, e);
    }
}
