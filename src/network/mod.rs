// Re-export network modules
pub mod api_client;
pub mod config;
pub mod event_stream;
pub mod watch;

// Re-export commonly used items
pub use api_client::GatewayClient;
pub use config::GatewayConfig;
pub use event_stream::{EventStream, ReconnectPolicy};
pub use watch::{WatchSession, WatchSlot};
