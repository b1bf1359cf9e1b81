//! WebSocket connection ownership
//!
//! Thin wrapper over tokio-tungstenite. The connection is owned exclusively
//! by the client's event-loop task; nothing else can touch the socket. Reads
//! surface as [`WsEvent`] so the task never handles transport frame variants
//! directly.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::frame::{coding::CloseCode, CloseFrame},
    tungstenite::protocol::Message as WsMessage,
    MaybeTlsStream, WebSocketStream,
};

use crate::{RealtimeError, Result};

/// Close code for an intentional, non-error shutdown
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code synthesized when the peer vanished without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code for a close frame that carried no status
const NO_STATUS: u16 = 1005;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Event surfaced from the read half
#[derive(Debug)]
pub enum WsEvent {
    /// Inbound text frame
    Frame(String),
    /// Close frame received, or the stream ended without one
    Closed { code: u16, reason: String },
    /// Transport error; the connection is unusable afterwards
    Error(String),
}

/// An established WebSocket connection
pub struct WsConnection {
    stream: WsStream,
}

impl WsConnection {
    /// Dial the endpoint, bounding the handshake with a timeout
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        let (stream, _) = timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                RealtimeError::Connection(format!(
                    "handshake timed out after {}s",
                    connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| RealtimeError::Connection(e.to_string()))?;

        Ok(Self { stream })
    }

    /// Split into independently usable write and read halves
    ///
    /// Needed so the event loop can select on inbound frames while writing
    /// heartbeats and outbound messages from other arms.
    pub fn into_split(self) -> (WsWriter, WsReader) {
        let (sink, stream) = self.stream.split();
        (WsWriter { sink }, WsReader { stream })
    }
}

/// Write half of the connection
pub struct WsWriter {
    sink: SplitSink<WsStream, WsMessage>,
}

impl WsWriter {
    /// Send one text frame
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(WsMessage::text(text))
            .await
            .map_err(|e| RealtimeError::Send(e.to_string()))
    }

    /// Send a normal-closure close frame with a client-initiated reason
    pub async fn close(&mut self, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_string().into(),
        };
        self.sink
            .send(WsMessage::Close(Some(frame)))
            .await
            .map_err(|e| RealtimeError::Send(e.to_string()))
    }
}

/// Read half of the connection
pub struct WsReader {
    stream: SplitStream<WsStream>,
}

impl WsReader {
    /// Next event from the socket
    ///
    /// Transport-level ping/pong is handled by tungstenite; binary frames
    /// are not part of the protocol and are skipped.
    pub async fn next_event(&mut self) -> WsEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return WsEvent::Frame(text.to_string()),
                Some(Ok(WsMessage::Close(frame))) => {
                    return match frame {
                        Some(f) => WsEvent::Closed {
                            code: f.code.into(),
                            reason: f.reason.to_string(),
                        },
                        None => WsEvent::Closed {
                            code: NO_STATUS,
                            reason: String::new(),
                        },
                    };
                }
                Some(Ok(WsMessage::Binary(_))) => {
                    tracing::debug!("Skipping unexpected binary frame");
                }
                Some(Ok(_)) => {} // ping/pong/raw frames
                Some(Err(e)) => return WsEvent::Error(e.to_string()),
                None => {
                    return WsEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: "connection lost".to_string(),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use futures_util::SinkExt;
    use tokio_tungstenite::accept_async;

    #[tokio::test]
    async fn test_connect_refused() {
        // Nothing listens on the reserved port
        let result = WsConnection::connect("ws://127.0.0.1:9/", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(RealtimeError::Connection(_))));
    }

    #[tokio::test]
    async fn test_text_frames_round_trip() {
        let (listener, host) = test_utils::bind().await;
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            // Echo the first frame back
            if let Some(Ok(msg)) = ws.next().await {
                ws.send(msg).await.unwrap();
            }
            ws
        });

        let url = format!("ws://{host}/");
        let conn = WsConnection::connect(&url, Duration::from_secs(5)).await.unwrap();
        let (mut writer, mut reader) = conn.into_split();

        writer.send_text("hello".to_string()).await.unwrap();
        match reader.next_event().await {
            WsEvent::Frame(text) => assert_eq!(text, "hello"),
            other => panic!("expected frame, got {other:?}"),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_close_frame_surfaces_code_and_reason() {
        let (listener, host) = test_utils::bind().await;
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "done".to_string().into(),
            };
            ws.send(WsMessage::Close(Some(frame))).await.unwrap();
        });

        let url = format!("ws://{host}/");
        let conn = WsConnection::connect(&url, Duration::from_secs(5)).await.unwrap();
        let (_writer, mut reader) = conn.into_split();

        match reader.next_event().await {
            WsEvent::Closed { code, reason } => {
                assert_eq!(code, NORMAL_CLOSURE);
                assert_eq!(reason, "done");
            }
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_peer_reads_as_abnormal_closure() {
        let (listener, host) = test_utils::bind().await;
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_async(tcp).await.unwrap();
            drop(ws);
        });

        let url = format!("ws://{host}/");
        let conn = WsConnection::connect(&url, Duration::from_secs(5)).await.unwrap();
        let (_writer, mut reader) = conn.into_split();

        match reader.next_event().await {
            WsEvent::Closed { code, .. } => assert_eq!(code, ABNORMAL_CLOSURE),
            // Depending on timing the reset can also surface as an error
            WsEvent::Error(_) => {}
            other => panic!("expected close or error, got {other:?}"),
        }
    }
}
