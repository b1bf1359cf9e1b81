//! Background event-loop task
//!
//! The task is the sole owner of the socket, the backoff sleep, and the
//! heartbeat ticker. Everything it does happens in one select loop, so
//! dispatch is single-threaded and in arrival order, and `disconnect()` can
//! cancel any pending timer by winning the race against it. The task exits
//! when every client handle has been dropped.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::{build_ws_url, TokenProvider};
use crate::core::message::{kinds, Message};
use crate::core::state::{ConnectionState, SharedState};
use crate::dispatch::{self, SharedRegistry};
use crate::infrastructure::config::RealtimeConfig;
use crate::infrastructure::metrics::ClientMetrics;
use crate::ws::backoff::ReconnectPolicy;
use crate::ws::connection::{WsConnection, WsEvent, WsWriter, ABNORMAL_CLOSURE, NORMAL_CLOSURE};
use crate::ws::heartbeat::Heartbeat;

use super::Command;

/// Reason sent with a client-initiated close
const CLIENT_CLOSE_REASON: &str = "client disconnect";

/// Next phase of the lifecycle state machine
enum Step {
    /// Wait for an explicit connect; `failed` selects the terminal variant
    Park { failed: bool },
    /// Fetch a credential and dial; `attempt` counts since the last open
    Dial { attempt: u32 },
    /// Schedule (or refuse to schedule) reconnect attempt `attempt`
    Backoff { attempt: u32 },
    /// All handles dropped
    Shutdown,
}

/// Close bookkeeping carried out of the session loop
struct CloseInfo {
    code: u16,
    reason: String,
}

/// State owned by the event-loop task
pub(crate) struct ConnectionTask {
    config: RealtimeConfig,
    policy: ReconnectPolicy,
    provider: Arc<dyn TokenProvider>,
    registry: SharedRegistry,
    state: SharedState,
    metrics: Arc<ClientMetrics>,
}

impl ConnectionTask {
    pub(crate) fn new(
        config: RealtimeConfig,
        provider: Arc<dyn TokenProvider>,
        registry: SharedRegistry,
        state: SharedState,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        let policy = config.reconnect_policy();
        Self {
            config,
            policy,
            provider,
            registry,
            state,
            metrics,
        }
    }

    /// Run the lifecycle state machine until shutdown
    pub(crate) async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut step = Step::Park { failed: false };
        loop {
            step = match step {
                Step::Park { failed } => self.park(&mut rx, failed).await,
                Step::Dial { attempt } => self.dial(&mut rx, attempt).await,
                Step::Backoff { attempt } => self.backoff(&mut rx, attempt).await,
                Step::Shutdown => break,
            };
        }
        tracing::debug!("Realtime client task exited");
    }

    /// Wait for an explicit connect, dropping sends
    async fn park(&self, rx: &mut mpsc::UnboundedReceiver<Command>, failed: bool) -> Step {
        self.set_state(if failed {
            ConnectionState::Failed
        } else {
            ConnectionState::Idle
        });

        loop {
            match rx.recv().await {
                Some(Command::Connect) => return Step::Dial { attempt: 0 },
                Some(Command::Send(msg)) => self.drop_send(&msg),
                Some(Command::Disconnect) | Some(Command::Visible) => {}
                None => return Step::Shutdown,
            }
        }
    }

    /// Fetch a credential and dial the endpoint
    async fn dial(&self, rx: &mut mpsc::UnboundedReceiver<Command>, attempt: u32) -> Step {
        self.set_state(ConnectionState::Connecting);

        // No credential is not an error: stay idle, the caller retries
        // after sign-in completes
        let Some(token) = self.provider.token().await else {
            tracing::debug!("No credential available, not connecting");
            return Step::Park { failed: false };
        };

        let url = match build_ws_url(&self.config, &token) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "Cannot build endpoint URL, not connecting");
                return Step::Park { failed: false };
            }
        };

        match WsConnection::connect(url.as_str(), self.config.connect_timeout()).await {
            Ok(conn) => self.session(rx, conn).await,
            Err(e) => {
                // A failed dial behaves like an abnormal close: never
                // surfaced to the caller, only scheduled for retry
                tracing::warn!(error = %e, attempt, "Connection attempt failed");
                self.emit(Message::error(&e.to_string()));
                Step::Backoff {
                    attempt: attempt + 1,
                }
            }
        }
    }

    /// Serve one open connection until it closes
    async fn session(
        &self,
        rx: &mut mpsc::UnboundedReceiver<Command>,
        conn: WsConnection,
    ) -> Step {
        self.set_state(ConnectionState::Open);
        self.metrics.set_connected(true);
        tracing::info!("Realtime connection open");
        self.emit(Message::open());

        let (mut writer, mut reader) = conn.into_split();
        let mut heartbeat = Heartbeat::new(self.config.heartbeat_period());

        let close = loop {
            tokio::select! {
                event = reader.next_event() => match event {
                    WsEvent::Frame(text) => self.handle_frame(&text),
                    WsEvent::Closed { code, reason } => {
                        break CloseInfo { code, reason };
                    }
                    WsEvent::Error(detail) => {
                        tracing::warn!(error = %detail, "WebSocket error");
                        self.emit(Message::error(&detail));
                        break CloseInfo {
                            code: ABNORMAL_CLOSURE,
                            reason: "connection error".to_string(),
                        };
                    }
                },
                cmd = rx.recv() => match cmd {
                    Some(Command::Send(msg)) => self.write(&mut writer, msg).await,
                    Some(Command::Disconnect) => {
                        let _ = writer.close(CLIENT_CLOSE_REASON).await;
                        break CloseInfo {
                            code: NORMAL_CLOSURE,
                            reason: CLIENT_CLOSE_REASON.to_string(),
                        };
                    }
                    Some(Command::Connect) => {
                        tracing::debug!("connect() while already open, ignoring");
                    }
                    Some(Command::Visible) => {}
                    None => {
                        let _ = writer.close("client shutdown").await;
                        self.metrics.set_connected(false);
                        return Step::Shutdown;
                    }
                },
                _ = heartbeat.tick() => {
                    self.write(&mut writer, Message::ping()).await;
                }
            }
        };

        self.metrics.set_connected(false);
        tracing::info!(code = close.code, reason = %close.reason, "Realtime connection closed");
        self.emit(Message::closed(close.code, &close.reason));

        // Normal closure never reconnects, whether the client or the
        // server initiated it
        if close.code == NORMAL_CLOSURE {
            Step::Park { failed: false }
        } else {
            Step::Backoff { attempt: 1 }
        }
    }

    /// Schedule one reconnect attempt, or give up once the budget is spent
    async fn backoff(&self, rx: &mut mpsc::UnboundedReceiver<Command>, attempt: u32) -> Step {
        if self.policy.exhausted(attempt) {
            tracing::error!(
                attempts = self.policy.max_attempts,
                "Reconnect attempts exhausted, giving up"
            );
            self.emit(Message::failed(&format!(
                "gave up after {} reconnect attempts",
                self.policy.max_attempts
            )));
            return Step::Park { failed: true };
        }

        let delay = self.policy.delay_for(attempt);
        self.set_state(ConnectionState::Reconnecting {
            attempt,
            next_delay: delay,
        });
        self.metrics.record_reconnect();
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Step::Dial { attempt },
                cmd = rx.recv() => match cmd {
                    Some(Command::Disconnect) => return Step::Park { failed: false },
                    Some(Command::Visible) => {
                        tracing::info!("Became visible, retrying immediately");
                        return Step::Dial { attempt };
                    }
                    Some(Command::Connect) => return Step::Dial { attempt },
                    Some(Command::Send(msg)) => self.drop_send(&msg),
                    None => return Step::Shutdown,
                }
            }
        }
    }

    /// Route one inbound text frame
    fn handle_frame(&self, text: &str) {
        match Message::parse(text) {
            Ok(msg) if msg.kind == kinds::PONG => {
                self.metrics.record_pong();
                tracing::trace!("Heartbeat reply absorbed");
            }
            Ok(msg) => {
                self.metrics.record_received();
                dispatch::dispatch(&self.registry, &msg);
            }
            Err(e) => {
                self.metrics.record_dropped_frame();
                tracing::warn!(error = %e, "Dropping malformed frame");
            }
        }
    }

    /// Serialize and write one outbound message
    async fn write(&self, writer: &mut WsWriter, msg: Message) {
        match msg.to_frame() {
            Ok(frame) => {
                if let Err(e) = writer.send_text(frame).await {
                    tracing::warn!(error = %e, kind = %msg.kind, "Write failed");
                } else {
                    self.metrics.record_sent();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = %msg.kind, "Dropping unserializable message");
            }
        }
    }

    /// Drop an outbound message queued while no socket was open
    fn drop_send(&self, msg: &Message) {
        self.metrics.record_send_dropped();
        tracing::warn!(kind = %msg.kind, "Not connected, dropping outbound message");
    }

    /// Publish a lifecycle transition
    fn set_state(&self, next: ConnectionState) {
        tracing::debug!(state = %next, "Connection state");
        *self.state.write() = next;
    }

    /// Deliver a synthetic lifecycle event through the normal dispatch path
    fn emit(&self, msg: Message) {
        dispatch::dispatch(&self.registry, &msg);
    }
}
