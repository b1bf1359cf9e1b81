//! Wire/application message envelope
//!
//! Every frame in both directions is one JSON-encoded envelope:
//! `{type, timestamp, data}`. The `type` field doubles as the subscription
//! key. Frames that do not parse as this shape are dropped before dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{RealtimeError, Result};

/// Reserved message kinds
///
/// `ping`/`pong` are liveness traffic; the `connection.*` kinds are synthetic
/// lifecycle events emitted locally, never received from the server.
pub mod kinds {
    /// Client-to-server heartbeat
    pub const PING: &str = "ping";
    /// Server heartbeat reply, absorbed before dispatch
    pub const PONG: &str = "pong";
    /// Socket reached the open state
    pub const CONNECTION_OPEN: &str = "connection.open";
    /// Socket closed, `data: {code, reason}`
    pub const CONNECTION_CLOSED: &str = "connection.closed";
    /// Socket-level error, `data: {error}`
    pub const CONNECTION_ERROR: &str = "connection.error";
    /// Reconnect attempts exhausted, terminal until the next explicit connect
    pub const CONNECTION_FAILED: &str = "connection.failed";
    /// Subscription key matching every delivered kind
    pub const WILDCARD: &str = "*";
}

/// Message envelope exchanged in both directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Discriminator; also the subscription key
    #[serde(rename = "type")]
    pub kind: String,
    /// RFC 3339 production time; client-stamped for pings and synthetic
    /// events, server-stamped otherwise
    pub timestamp: String,
    /// Opaque kind-specific payload, always a JSON object
    pub data: Value,
}

impl Message {
    /// Create a message with a fresh client-side timestamp
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            timestamp: now_rfc3339(),
            data,
        }
    }

    /// Heartbeat ping with an empty payload
    pub fn ping() -> Self {
        Self::new(kinds::PING, serde_json::json!({}))
    }

    /// Synthetic lifecycle event: socket opened
    pub fn open() -> Self {
        Self::new(kinds::CONNECTION_OPEN, serde_json::json!({}))
    }

    /// Synthetic lifecycle event: socket closed
    pub fn closed(code: u16, reason: &str) -> Self {
        Self::new(
            kinds::CONNECTION_CLOSED,
            serde_json::json!({ "code": code, "reason": reason }),
        )
    }

    /// Synthetic lifecycle event: socket-level error
    pub fn error(description: &str) -> Self {
        Self::new(
            kinds::CONNECTION_ERROR,
            serde_json::json!({ "error": description }),
        )
    }

    /// Synthetic lifecycle event: reconnect attempts exhausted
    pub fn failed(reason: &str) -> Self {
        Self::new(
            kinds::CONNECTION_FAILED,
            serde_json::json!({ "reason": reason }),
        )
    }

    /// Parse an inbound text frame as an envelope
    ///
    /// All three fields must be present and `data` must be an object.
    /// Anything else is a parse error; the caller drops the frame.
    pub fn parse(frame: &str) -> Result<Self> {
        let msg: Message =
            serde_json::from_str(frame).map_err(|e| RealtimeError::Parse(e.to_string()))?;
        if !msg.data.is_object() {
            return Err(RealtimeError::Parse(format!(
                "data field is not an object in '{}' message",
                msg.kind
            )));
        }
        Ok(msg)
    }

    /// Serialize for the wire
    ///
    /// The envelope shape (string kind, string timestamp, JSON object data)
    /// cannot fail to serialize; the error arm guards a future shape change.
    pub fn to_frame(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| RealtimeError::Send(e.to_string()))
    }
}

/// Current time as an RFC 3339 string
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
