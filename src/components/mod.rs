pub mod canvas_editor;
pub mod inspector;
pub mod log_view;
pub mod output_view;
pub mod queue_view;
