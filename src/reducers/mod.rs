//! Sub-reducers behind the root `update.rs`.
//!
//! Each domain (canvas input, workflow asset, jobs) lives in its own module
//! and returns `true` when it consumed the message.

pub mod canvas;
pub mod jobs;
pub mod workflow;
