//! Connection lifecycle state
//!
//! Explicit tagged union instead of flags on a socket object. The event-loop
//! task is the only writer; handles read through a shared lock. The pending
//! reconnect delay lives inside the `Reconnecting` variant, so a scheduled
//! retry without the intent to reconnect cannot be represented.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

/// State cell shared between the event-loop task (sole writer) and handles
pub type SharedState = Arc<RwLock<ConnectionState>>;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket, no retry pending; waiting for an explicit connect
    Idle,
    /// Credential fetch or dial in progress
    Connecting,
    /// Socket fully open, heartbeat running
    Open,
    /// Abnormal close observed; one retry scheduled
    Reconnecting {
        /// Attempt count since the last successful open (1-based)
        attempt: u32,
        /// Delay before that attempt fires
        next_delay: Duration,
    },
    /// Retry budget exhausted; terminal until the next explicit connect
    Failed,
}

impl ConnectionState {
    /// True iff the socket is fully open
    #[inline(always)]
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Short label for logging and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting { .. } => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Reconnecting { attempt, next_delay } => {
                write!(f, "reconnecting (attempt {attempt}, in {next_delay:?})")
            }
            other => f.write_str(other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_open_is_open() {
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Idle.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(!ConnectionState::Failed.is_open());
        assert!(!ConnectionState::Reconnecting {
            attempt: 1,
            next_delay: Duration::from_secs(5)
        }
        .is_open());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Idle.to_string(), "idle");
        let reconnecting = ConnectionState::Reconnecting {
            attempt: 3,
            next_delay: Duration::from_secs(20),
        };
        assert!(reconnecting.to_string().contains("attempt 3"));
    }
}
