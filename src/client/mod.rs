//! Realtime client service object
//!
//! One instance per application, constructed at startup with an injected
//! token provider and handed to consumers by cloning. All methods are
//! non-blocking and never fail: they enqueue commands for the background
//! event-loop task, and every failure surfaces as a lifecycle event through
//! the same `subscribe` mechanism that carries server messages.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use realtime_client::{Message, RealtimeClient, RealtimeConfig, StaticToken};
//!
//! # async fn demo() {
//! let config = RealtimeConfig::load().unwrap_or_default();
//! let client = RealtimeClient::spawn(config, Arc::new(StaticToken::new("token")));
//!
//! let sub = client.subscribe("document.processing.completed", |msg| {
//!     println!("document ready: {}", msg.data);
//! });
//! client.connect();
//! # sub.unsubscribe();
//! # }
//! ```

mod task;

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};

use crate::auth::TokenProvider;
use crate::core::message::Message;
use crate::core::state::{ConnectionState, SharedState};
use crate::dispatch::{self, Registry, SharedRegistry, Subscription};
use crate::infrastructure::config::RealtimeConfig;
use crate::infrastructure::metrics::{ClientMetrics, ClientMetricsSnapshot};

use task::ConnectionTask;

/// Commands fed to the event-loop task
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    Send(Message),
    Visible,
}

/// Handle to the realtime messaging client
///
/// Cheap to clone; all clones share one connection, one registry, and one
/// background task. The task shuts down when the last handle is dropped.
#[derive(Clone)]
pub struct RealtimeClient {
    command_tx: mpsc::UnboundedSender<Command>,
    registry: SharedRegistry,
    state: SharedState,
    metrics: Arc<ClientMetrics>,
}

impl RealtimeClient {
    /// Construct the client and spawn its background task
    ///
    /// Must run inside a tokio runtime. Does not connect; call
    /// [`connect`](Self::connect) once a credential may be available.
    pub fn spawn(config: RealtimeConfig, provider: Arc<dyn TokenProvider>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let registry: SharedRegistry = Arc::new(RwLock::new(Registry::new()));
        let state: SharedState = Arc::new(RwLock::new(ConnectionState::Idle));
        let metrics = Arc::new(ClientMetrics::new());

        let task = ConnectionTask::new(
            config,
            provider,
            Arc::clone(&registry),
            Arc::clone(&state),
            Arc::clone(&metrics),
        );
        tokio::spawn(task.run(command_rx));

        Self {
            command_tx,
            registry,
            state,
            metrics,
        }
    }

    /// Open the connection
    ///
    /// Idempotent: a no-op while already open or connecting. Without a
    /// credential the attempt aborts silently; call again once
    /// authenticated.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Close the connection and stop reconnecting
    ///
    /// Cancels any pending reconnect, stops the heartbeat, and closes an
    /// open socket with the normal-closure code. The client stays idle
    /// until the next explicit [`connect`](Self::connect).
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// True iff the socket is fully open
    pub fn is_connected(&self) -> bool {
        self.state.read().is_open()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Register a handler for a message kind (or the wildcard `"*"`)
    ///
    /// Synthetic lifecycle events (`connection.open`, `connection.closed`,
    /// `connection.error`, `connection.failed`) arrive through the same
    /// mechanism as server messages. Takes effect before the next dispatch
    /// cycle.
    pub fn subscribe(
        &self,
        kind: &str,
        handler: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Subscription {
        dispatch::subscribe(&self.registry, kind, handler)
    }

    /// Send a message, best-effort
    ///
    /// Written to the socket only while open; otherwise dropped with a
    /// logged warning. Callers must not assume delivery.
    pub fn send(&self, message: Message) {
        self.command(Command::Send(message));
    }

    /// Signal that the hosting context became visible again
    ///
    /// While a reconnect is pending, triggers an immediate attempt instead
    /// of waiting out the backoff delay. A no-op in any other state.
    pub fn notify_visible(&self) {
        self.command(Command::Visible);
    }

    /// Forward a host visibility signal to [`notify_visible`](Self::notify_visible)
    ///
    /// The forwarder task ends when the sender side of the watch is
    /// dropped.
    pub fn watch_visibility(&self, mut visibility: watch::Receiver<bool>) {
        let command_tx = self.command_tx.clone();
        tokio::spawn(async move {
            while visibility.changed().await.is_ok() {
                if *visibility.borrow() {
                    let _ = command_tx.send(Command::Visible);
                }
            }
        });
    }

    /// Metrics snapshot
    pub fn metrics(&self) -> ClientMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn command(&self, command: Command) {
        if self.command_tx.send(command).is_err() {
            tracing::debug!("Client task is gone, command dropped");
        }
    }
}
