//! Shared helpers for socket-level tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;

use crate::auth::TokenProvider;
use crate::infrastructure::config::RealtimeConfig;

/// Bind an ephemeral localhost listener, returning it with its host string
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
    (listener, host)
}

/// Config pointing at a test server, with timers fast enough for tests
pub fn fast_config(host: &str) -> RealtimeConfig {
    let mut config = RealtimeConfig::default();
    config.connection.host = host.to_string();
    config.connection.connect_timeout_secs = 2;
    // Out of the way unless a test shortens it
    config.connection.heartbeat_interval_secs = 60;
    config.reconnect.base_delay_ms = 50;
    config.reconnect.max_delay_ms = 200;
    config.reconnect.max_attempts = 10;
    config
}

/// Token provider that counts how many times it was asked
pub struct CountingToken {
    calls: AtomicUsize,
    token: Option<String>,
}

impl CountingToken {
    /// Provider that always yields the given token
    pub fn new(token: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            token: Some(token.to_string()),
        })
    }

    /// Provider that never yields a token
    pub fn unauthenticated() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            token: None,
        })
    }

    /// Number of credential fetches so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for CountingToken {
    async fn token(&self) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token.clone()
    }
}
