//! Resilient realtime messaging client
//!
//! Maintains exactly one persistent WebSocket connection to the backend and
//! multiplexes its traffic to any number of independent subscribers, keyed by
//! message type. Recovers from network interruption with bounded exponential
//! backoff and keeps the link alive with an application-level heartbeat.
//!
//! # Architecture
//! - **core**: message envelope and connection state types
//! - **dispatch**: type-keyed pub/sub registry with wildcard subscribers
//! - **ws**: socket ownership, reconnect policy, heartbeat
//! - **auth**: token provider boundary and endpoint URL construction
//! - **client**: public handle plus the background event-loop task
//! - **infrastructure**: cold path (config, logging, metrics)

pub mod auth;
pub mod client;
pub mod core;
pub mod dispatch;
pub mod infrastructure;
pub mod ws;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use crate::auth::{StaticToken, TokenProvider};
pub use crate::client::RealtimeClient;
pub use crate::core::message::{kinds, Message};
pub use crate::core::state::ConnectionState;
pub use crate::dispatch::Subscription;
pub use crate::infrastructure::config::RealtimeConfig;

use thiserror::Error;

/// Main error type for the realtime client
///
/// Never returned from the public `RealtimeClient` methods; failures there
/// surface as lifecycle events. This type flows through the internal
/// connection and parsing paths.
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RealtimeError>;
