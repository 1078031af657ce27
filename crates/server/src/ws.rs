// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws/ingest` stream channel. Wire types mirror
//! `crates/agent/src/transport/stream.rs` exactly: a
//! `{apiKey, clientId}` handshake, `kind`-tagged batch/heartbeat frames.
//! Handler shape grounded on `crates/mux/src/transport/ws.rs`'s
//! `on_upgrade` + split-sink/stream `tokio::select!` loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use beacon_common::{EventPayload, SourceChannel};

use crate::ingest::accept_event;
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeRequest {
    api_key: String,
    #[allow(dead_code)]
    client_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
enum HandshakeResponse {
    #[serde(rename = "session-ok")]
    SessionOk,
    #[serde(rename = "close-with-reason")]
    Close { reason: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AgentMessage {
    Batch { events: Vec<EventPayload> },
    Heartbeat,
}

#[derive(Debug, Serialize)]
struct BatchFailure {
    index: u32,
    reason: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ServerMessage {
    BatchAck { processed: u32, failed: u32, failures: Vec<BatchFailure> },
    Heartbeat,
}

pub async fn ws_ingest(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let Some(Ok(Message::Text(text))) = socket.next().await else {
        let _ = socket.close().await;
        return;
    };
    let Ok(handshake) = serde_json::from_str::<HandshakeRequest>(&text) else {
        send_close(&mut socket, "malformed handshake").await;
        return;
    };
    let Some(tenant_id) = state.tenants.resolve_api_key(&handshake.api_key) else {
        send_close(&mut socket, "unauthenticated").await;
        return;
    };

    let ok = serde_json::to_string(&HandshakeResponse::SessionOk).unwrap_or_default();
    if socket.send(Message::Text(ok.into())).await.is_err() {
        return;
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,

            _ = heartbeat.tick() => {
                let text = serde_json::to_string(&ServerMessage::Heartbeat).unwrap_or_default();
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            msg = socket.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_agent_message(&mut socket, &state, tenant_id, &text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

/// Returns `false` when the connection should close.
async fn handle_agent_message(socket: &mut WebSocket, state: &AppState, tenant_id: beacon_common::TenantId, text: &str) -> bool {
    let Ok(message) = serde_json::from_str::<AgentMessage>(text) else {
        return true; // unparseable frame, tolerated, agent will time out waiting for an ack
    };

    match message {
        AgentMessage::Heartbeat => true,
        AgentMessage::Batch { events } => {
            let mut failures = Vec::new();
            let mut processed = 0u32;
            for (index, payload) in events.into_iter().enumerate() {
                match accept_event(state, tenant_id, payload, SourceChannel::Stream) {
                    Ok(_) => processed += 1,
                    Err(err) => failures.push(BatchFailure { index: index as u32, reason: err.message }),
                }
            }
            let ack = ServerMessage::BatchAck { processed, failed: failures.len() as u32, failures };
            let Ok(text) = serde_json::to_string(&ack) else { return false };
            socket.send(Message::Text(text.into())).await.is_ok()
        }
    }
}

async fn send_close(socket: &mut WebSocket, reason: &str) {
    let body = HandshakeResponse::Close { reason: reason.to_owned() };
    if let Ok(text) = serde_json::to_string(&body) {
        let _ = socket.send(Message::Text(text.into())).await;
    }
    let _ = socket.close().await;
}
