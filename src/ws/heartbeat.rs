//! Application-level heartbeat
//!
//! While the connection is open, a `ping` envelope goes out every interval
//! to keep idle-timeout-enforcing intermediaries from dropping the link. The
//! server's `pong` reply is absorbed by the dispatcher; there is no
//! client-side pong timeout, liveness beyond the transport's own timeout is
//! not enforced.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Heartbeat ticker
///
/// Lives inside the open-session arm of the event loop, so it cannot outlive
/// the connection and at most one exists at any time.
pub struct Heartbeat {
    interval: Interval,
}

impl Heartbeat {
    /// Create a ticker whose first tick fires one full period after now
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Wait for the next tick
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
