// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket realtime transport for the DoHelp chat subsystem.
//!
//! Implements [`RealtimeTransport`] over tokio-tungstenite. One connection
//! exists per logged-in session, parameterized by the current user's id;
//! room membership scopes it to a single conversation. Inbound frames are
//! decoded on a spawned read task and forwarded to an event queue the
//! controller drains via [`RealtimeTransport::next_event`].

pub mod frame;

use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dohelp_config::model::RealtimeConfig;
use dohelp_core::error::DohelpError;
use dohelp_core::traits::{PlatformAdapter, RealtimeTransport};
use dohelp_core::types::{AdapterType, HealthStatus, RealtimeEvent, UserId};

use crate::frame::{ClientFrame, ServerFrame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// One live connection: the write half plus the read task's cancellation.
struct Connection {
    writer: Mutex<WsSink>,
    cancel: CancellationToken,
}

/// WebSocket transport implementing [`RealtimeTransport`].
///
/// Uses interior mutability throughout so the controller's event pump can
/// block on [`next_event`](RealtimeTransport::next_event) while room joins
/// are issued concurrently.
pub struct WsTransport {
    config: RealtimeConfig,
    events_tx: mpsc::Sender<RealtimeEvent>,
    events_rx: Mutex<mpsc::Receiver<RealtimeEvent>>,
    conn: Mutex<Option<Connection>>,
}

impl WsTransport {
    /// Creates a transport that will dial `config.url` on connect.
    pub fn new(config: RealtimeConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            config,
            events_tx,
            events_rx: Mutex::new(events_rx),
            conn: Mutex::new(None),
        }
    }

    /// Returns true while a connection is held.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }
}

/// Builds the connection URL, scoping it to `user` via query parameter.
fn connect_url(base: &str, user: &UserId) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}user={user}")
}

/// Read task body: decodes inbound frames until the socket closes, the
/// stream errors, or the cancellation token fires. Emits exactly one
/// `Disconnected` on the way out.
async fn read_loop(
    mut stream: futures::stream::SplitStream<WsStream>,
    events_tx: mpsc::Sender<RealtimeEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("realtime read loop cancelled");
                break;
            }
            item = stream.next() => {
                match item {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerFrame>(text.as_str()) {
                            Ok(ServerFrame::MessageReceived { message }) => {
                                if events_tx
                                    .send(RealtimeEvent::MessageReceived(message))
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Ok(ServerFrame::MessageSeen { message_id }) => {
                                if events_tx
                                    .send(RealtimeEvent::MessageSeen { message_id })
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Err(e) => {
                                // Unknown or malformed frames are never fatal.
                                warn!(error = %e, "skipping undecodable realtime frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("realtime connection closed by peer");
                        break;
                    }
                    Some(Ok(_)) => {} // ping/pong/binary
                    Some(Err(e)) => {
                        warn!(error = %e, "realtime stream error");
                        break;
                    }
                }
            }
        }
    }

    let _ = events_tx.send(RealtimeEvent::Disconnected).await;
}

#[async_trait]
impl PlatformAdapter for WsTransport {
    fn name(&self) -> &str {
        "realtime-ws"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Realtime
    }

    async fn health_check(&self) -> Result<HealthStatus, DohelpError> {
        if self.is_connected().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("not connected".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), DohelpError> {
        self.disconnect().await
    }
}

#[async_trait]
impl RealtimeTransport for WsTransport {
    async fn connect(&self, user: &UserId) -> Result<(), DohelpError> {
        let mut conn = self.conn.lock().await;
        if conn.is_some() {
            return Ok(()); // Already connected
        }

        // Events queued before this connect belong to a previous connection.
        {
            let mut rx = self.events_rx.lock().await;
            while rx.try_recv().is_ok() {}
        }

        let url = connect_url(&self.config.url, user);
        let timeout = std::time::Duration::from_secs(self.config.connect_timeout_secs);

        let (stream, _response) = tokio::time::timeout(timeout, connect_async(&url))
            .await
            .map_err(|_| DohelpError::Timeout { duration: timeout })?
            .map_err(|e| DohelpError::Transport {
                message: format!("WebSocket handshake failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(user = %user, "realtime connection established");

        let (writer, reader) = stream.split();
        let cancel = CancellationToken::new();
        tokio::spawn(read_loop(reader, self.events_tx.clone(), cancel.clone()));

        *conn = Some(Connection {
            writer: Mutex::new(writer),
            cancel,
        });

        // Connected is delivered through the same queue as inbound frames so
        // the controller observes status transitions in order.
        self.events_tx
            .send(RealtimeEvent::Connected)
            .await
            .map_err(|_| DohelpError::Transport {
                message: "event queue closed".into(),
                source: None,
            })
    }

    async fn join_room(&self, room: &str) -> Result<(), DohelpError> {
        let conn = self.conn.lock().await;
        let conn = conn.as_ref().ok_or_else(|| DohelpError::Transport {
            message: "cannot join room: not connected".into(),
            source: None,
        })?;

        let frame = serde_json::to_string(&ClientFrame::JoinRoom {
            room: room.to_string(),
        })
        .map_err(|e| DohelpError::Internal(format!("failed to encode frame: {e}")))?;

        debug!(room, "joining realtime room");

        conn.writer
            .lock()
            .await
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| DohelpError::Transport {
                message: format!("failed to send join-room frame: {e}"),
                source: Some(Box::new(e)),
            })
    }

    async fn next_event(&self) -> Result<RealtimeEvent, DohelpError> {
        let mut rx = self.events_rx.lock().await;
        rx.recv().await.ok_or_else(|| DohelpError::Transport {
            message: "realtime event queue closed".into(),
            source: None,
        })
    }

    async fn disconnect(&self) -> Result<(), DohelpError> {
        let Some(conn) = self.conn.lock().await.take() else {
            return Ok(());
        };

        conn.cancel.cancel();
        // Best-effort close frame; the peer may already be gone.
        let _ = conn.writer.lock().await.send(Message::Close(None)).await;

        info!("realtime connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dohelp_core::types::{ChatMessage, ConversationId, MessageId};
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[test]
    fn connect_url_appends_user_query() {
        let user = UserId("42".into());
        assert_eq!(
            connect_url("ws://rt.example/socket", &user),
            "ws://rt.example/socket?user=42"
        );
        assert_eq!(
            connect_url("ws://rt.example/socket?v=2", &user),
            "ws://rt.example/socket?v=2&user=42"
        );
    }

    fn test_message(id: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId(id.into()),
            conversation_id: ConversationId("C1".into()),
            sender: UserId("U2".into()),
            body: "hi".into(),
            created_at: "2026-08-06T12:00:00Z".parse().unwrap(),
            seen: false,
        }
    }

    /// One-shot echo server: accepts a single connection, records the first
    /// frame it receives, then pushes a message-received frame.
    async fn spawn_server() -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let first = ws
                .next()
                .await
                .expect("expected a frame")
                .expect("frame should decode")
                .into_text()
                .expect("frame should be text")
                .to_string();

            let push = serde_json::to_string(&ServerFrame::MessageReceived {
                message: test_message("3"),
            })
            .unwrap();
            ws.send(Message::Text(push.into())).await.unwrap();

            first
        });

        (format!("ws://{addr}/socket"), handle)
    }

    #[tokio::test]
    async fn connect_join_receive_disconnect() {
        let (url, server) = spawn_server().await;

        let transport = WsTransport::new(RealtimeConfig {
            url,
            connect_timeout_secs: 5,
        });

        transport.connect(&UserId("U1".into())).await.unwrap();
        assert_eq!(
            transport.next_event().await.unwrap(),
            RealtimeEvent::Connected
        );

        transport.join_room("conversation:C1").await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), transport.next_event())
            .await
            .expect("pushed event should arrive")
            .unwrap();
        match event {
            RealtimeEvent::MessageReceived(msg) => assert_eq!(msg.id, MessageId("3".into())),
            other => panic!("expected message-received, got {other:?}"),
        }

        let join_frame = server.await.unwrap();
        let parsed: ClientFrame = serde_json::from_str(&join_frame).unwrap();
        assert_eq!(
            parsed,
            ClientFrame::JoinRoom {
                room: "conversation:C1".into()
            }
        );

        transport.disconnect().await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), transport.next_event())
            .await
            .expect("disconnect should be observable")
            .unwrap();
        assert_eq!(event, RealtimeEvent::Disconnected);
        assert!(!transport.is_connected().await);
    }

    #[tokio::test]
    async fn connect_is_idempotent_while_held() {
        let (url, _server) = spawn_server().await;

        let transport = WsTransport::new(RealtimeConfig {
            url,
            connect_timeout_secs: 5,
        });

        transport.connect(&UserId("U1".into())).await.unwrap();
        transport.connect(&UserId("U1".into())).await.unwrap();

        // Exactly one Connected event for the single underlying connection.
        assert_eq!(
            transport.next_event().await.unwrap(),
            RealtimeEvent::Connected
        );
    }

    #[tokio::test]
    async fn join_room_without_connection_fails() {
        let transport = WsTransport::new(RealtimeConfig {
            url: "ws://127.0.0.1:9/socket".into(),
            connect_timeout_secs: 1,
        });
        let err = transport.join_room("conversation:C1").await.unwrap_err();
        assert!(matches!(err, DohelpError::Transport { .. }));
    }
}
