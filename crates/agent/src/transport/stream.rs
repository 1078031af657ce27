// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The streaming channel: a single long-lived WebSocket connection,
//! handshake carrying `{apiKey, clientId}`, per-batch acknowledgment,
//! bidirectional heartbeats. Connection pattern
//! (`connect_async`, split sink/stream, `tokio::select!` reader loop) is
//! grounded on `crates/mux/src/upstream/feed.rs`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use uuid::Uuid;

use crate::error::AgentError;
use crate::queue::PendingEvent;
use crate::transport::{to_wire_payload, ShipOutcome};

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeRequest {
    api_key: String,
    client_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status")]
enum HandshakeResponse {
    #[serde(rename = "session-ok")]
    SessionOk,
    #[serde(rename = "close-with-reason")]
    Close { reason: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AgentMessage {
    Batch { events: Vec<beacon_common::EventPayload> },
    Heartbeat,
}

#[derive(Debug, Clone, Deserialize)]
struct BatchFailure {
    index: u32,
    reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ServerMessage {
    BatchAck { processed: u32, #[serde(default)] failed: u32, #[serde(default)] failures: Vec<BatchFailure> },
    Heartbeat,
}

pub struct StreamChannel {
    write: AsyncMutex<futures_util::stream::SplitSink<WsStream, Message>>,
    acks: AsyncMutex<mpsc::Receiver<ServerMessage>>,
    last_heartbeat: Arc<Mutex<Instant>>,
    reader: tokio::task::JoinHandle<()>,
}

impl StreamChannel {
    pub async fn connect(url: &str, api_key: &str, client_id: Uuid) -> Result<Self, AgentError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| AgentError::Transient(format!("stream connect failed: {e}")))?;
        let (mut write, mut read) = ws.split();

        let handshake = HandshakeRequest { api_key: api_key.to_owned(), client_id };
        let text = serde_json::to_string(&handshake)
            .map_err(|e| AgentError::Transient(format!("serializing handshake: {e}")))?;
        write.send(Message::Text(text.into())).await.map_err(|e| AgentError::Transient(format!("handshake send failed: {e}")))?;

        let first = read
            .next()
            .await
            .ok_or_else(|| AgentError::Transient("stream closed during handshake".into()))?
            .map_err(|e| AgentError::Transient(format!("handshake read failed: {e}")))?;
        let Message::Text(text) = first else {
            return Err(AgentError::Transient("unexpected handshake frame".into()));
        };
        match serde_json::from_str::<HandshakeResponse>(&text) {
            Ok(HandshakeResponse::SessionOk) => {}
            Ok(HandshakeResponse::Close { reason }) => return Err(AgentError::Credential(reason)),
            Err(e) => return Err(AgentError::Transient(format!("unparseable handshake response: {e}"))),
        }

        let (ack_tx, ack_rx) = mpsc::channel(8);
        let last_heartbeat = Arc::new(Mutex::new(Instant::now()));
        let heartbeat_clone = Arc::clone(&last_heartbeat);

        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(ServerMessage::Heartbeat) => {
                            *heartbeat_clone.lock() = Instant::now();
                        }
                        Ok(other) => {
                            if ack_tx.send(other).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(%e, "unparseable stream message");
                        }
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        });

        Ok(Self { write: AsyncMutex::new(write), acks: AsyncMutex::new(ack_rx), last_heartbeat, reader })
    }

    pub fn last_heartbeat_age(&self) -> Duration {
        self.last_heartbeat.lock().elapsed()
    }

    pub async fn send_batch(&self, events: &[PendingEvent]) -> Result<ShipOutcome, AgentError> {
        let payloads = events.iter().map(to_wire_payload).collect();
        let message = AgentMessage::Batch { events: payloads };
        let text = serde_json::to_string(&message)
            .map_err(|e| AgentError::Transient(format!("serializing batch: {e}")))?;

        self.write
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| AgentError::Transient(format!("batch send failed: {e}")))?;

        let ack = self
            .acks
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| AgentError::Transient("stream closed awaiting batch ack".into()))?;

        match ack {
            ServerMessage::BatchAck { failures, .. } => {
                let failed_indices: std::collections::HashSet<u32> = failures.iter().map(|f| f.index).collect();
                let mut acked_ids = Vec::new();
                let mut failed = Vec::new();
                for (idx, event) in events.iter().enumerate() {
                    if let Some(f) = failures.iter().find(|f| f.index as usize == idx) {
                        failed.push((event.id, f.reason.clone()));
                    } else if !failed_indices.contains(&(idx as u32)) {
                        acked_ids.push(event.id);
                    }
                }
                Ok(ShipOutcome { acked_ids, failed })
            }
            ServerMessage::Heartbeat => Err(AgentError::Transient("expected batch ack, got heartbeat".into())),
        }
    }

    pub async fn send_heartbeat(&self) -> Result<(), AgentError> {
        let text = serde_json::to_string(&AgentMessage::Heartbeat)
            .map_err(|e| AgentError::Transient(format!("serializing heartbeat: {e}")))?;
        self.write
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| AgentError::Transient(format!("heartbeat send failed: {e}")))
    }

    pub async fn close(self) {
        self.reader.abort();
        let _ = self.write.lock().await.close().await;
    }
}
