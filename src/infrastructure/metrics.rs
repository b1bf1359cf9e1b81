//! Client metrics
//!
//! Lock-free counters updated from the event-loop task, snapshotted for
//! export by whatever surface the host app exposes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Realtime client metrics
pub struct ClientMetrics {
    /// Server messages delivered to the dispatcher
    messages_received: AtomicU64,
    /// Heartbeat replies absorbed before dispatch
    pongs_absorbed: AtomicU64,
    /// Inbound frames dropped as malformed
    frames_dropped: AtomicU64,
    /// Messages written to the socket (including pings)
    messages_sent: AtomicU64,
    /// Sends dropped because no socket was open
    sends_dropped: AtomicU64,
    /// Reconnect attempts scheduled
    reconnects_scheduled: AtomicU64,
    /// Connection status (0 = down, 1 = open)
    connected: AtomicU64,
    /// Start time for uptime calculation
    started_at: Instant,
}

/// Metrics snapshot for export
#[derive(Debug, Clone, Copy)]
pub struct ClientMetricsSnapshot {
    pub messages_received: u64,
    pub pongs_absorbed: u64,
    pub frames_dropped: u64,
    pub messages_sent: u64,
    pub sends_dropped: u64,
    pub reconnects_scheduled: u64,
    pub connected: bool,
    pub uptime_seconds: u64,
}

impl ClientMetrics {
    /// Create a zeroed collector
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            pongs_absorbed: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            sends_dropped: AtomicU64::new(0),
            reconnects_scheduled: AtomicU64::new(0),
            connected: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_pong(&self) {
        self.pongs_absorbed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped_frame(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_send_dropped(&self) {
        self.sends_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reconnect(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the connection status flag
    pub fn set_connected(&self, connected: bool) {
        self.connected
            .store(if connected { 1 } else { 0 }, Ordering::Relaxed);
    }

    /// Current snapshot
    pub fn snapshot(&self) -> ClientMetricsSnapshot {
        ClientMetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            pongs_absorbed: self.pongs_absorbed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            sends_dropped: self.sends_dropped.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
            connected: self.connected.load(Ordering::Relaxed) != 0,
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_on_creation() {
        let metrics = ClientMetrics::new();
        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.messages_received, 0);
        assert_eq!(snapshot.frames_dropped, 0);
        assert!(!snapshot.connected);
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = ClientMetrics::new();

        metrics.record_received();
        metrics.record_received();
        metrics.record_pong();
        metrics.record_dropped_frame();
        metrics.record_sent();
        metrics.record_send_dropped();
        metrics.record_reconnect();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.pongs_absorbed, 1);
        assert_eq!(snapshot.frames_dropped, 1);
        assert_eq!(snapshot.messages_sent, 1);
        assert_eq!(snapshot.sends_dropped, 1);
        assert_eq!(snapshot.reconnects_scheduled, 1);
    }

    #[test]
    fn test_connected_flag() {
        let metrics = ClientMetrics::new();

        metrics.set_connected(true);
        assert!(metrics.snapshot().connected);

        metrics.set_connected(false);
        assert!(!metrics.snapshot().connected);
    }
}
