//! WebSocket transport: socket ownership, reconnect policy, heartbeat

pub mod backoff;
pub mod connection;
pub mod heartbeat;

pub use backoff::ReconnectPolicy;
pub use connection::{WsConnection, WsEvent, ABNORMAL_CLOSURE, NORMAL_CLOSURE};
pub use heartbeat::Heartbeat;
