// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport multiplexer: picks between a streaming channel and an HTTP
//! fallback, advancing through an explicit four-phase state machine.
//! Reconnect-with-backoff shape grounded on `crates/mux/src/upstream/feed.rs`
//! and `upstream/health.rs`, generalized to also fall back to a second
//! channel rather than only ever reconnecting the one it has.

pub mod http;
pub mod stream;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beacon_common::EventPayload;
use parking_lot::Mutex;
use rand::Rng;
use time::OffsetDateTime;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::queue::PendingEvent;
use http::HttpChannel;
use stream::StreamChannel;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
const HEARTBEAT_WINDOW: Duration = Duration::from_secs(60);
/// How often the heartbeat clock sends its half of the bidirectional
/// heartbeat. Comfortably under the 30s bound so a single delayed tick
/// never trips the server's own liveness check.
pub const HEARTBEAT_SEND_INTERVAL: Duration = Duration::from_secs(15);
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(30);
const MAX_CONNECT_FAILURES: u32 = 10;

/// Which channel the multiplexer is currently routing batches through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stream,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disconnected,
    Connecting,
    Streaming,
    HttpOnly,
}

/// Outcome of shipping one batch, reported back to the shipper loop.
pub struct ShipOutcome {
    pub acked_ids: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
}

pub struct TransportMultiplexer {
    config: Arc<AgentConfig>,
    client_id: Uuid,
    phase: Mutex<Phase>,
    consecutive_failures: AtomicU32,
    stream: AsyncMutex<Option<StreamChannel>>,
    http: HttpChannel,
    last_http_only_entry: Mutex<Option<std::time::Instant>>,
    cancel: CancellationToken,
}

impl TransportMultiplexer {
    pub fn new(config: Arc<AgentConfig>, client_id: Uuid, cancel: CancellationToken) -> Result<Self, AgentError> {
        let http = HttpChannel::new(&config)?;
        Ok(Self {
            config,
            client_id,
            phase: Mutex::new(Phase::Disconnected),
            consecutive_failures: AtomicU32::new(0),
            stream: AsyncMutex::new(None),
            http,
            last_http_only_entry: Mutex::new(None),
            cancel,
        })
    }

    pub fn current_channel(&self) -> Channel {
        match *self.phase.lock() {
            Phase::Streaming => Channel::Stream,
            _ => Channel::Http,
        }
    }

    /// Batch size the shipper should use for the currently active channel.
    pub fn batch_size(&self) -> usize {
        match self.current_channel() {
            Channel::Stream => 50,
            Channel::Http => 1,
        }
    }

    /// Ensure a channel is ready, driving the state machine forward. Called
    /// by the shipper before each drain attempt.
    pub async fn ensure_connected(&self) {
        let phase = *self.phase.lock();
        match phase {
            Phase::Streaming | Phase::HttpOnly => return,
            Phase::Connecting => return,
            Phase::Disconnected => {}
        }

        *self.phase.lock() = Phase::Connecting;
        self.try_connect_stream().await;
    }

    async fn try_connect_stream(&self) {
        let ws_url = self.config.stream_url();
        match tokio::time::timeout(
            CONNECT_TIMEOUT,
            StreamChannel::connect(&ws_url, &self.config.api_key, self.client_id),
        )
        .await
        {
            Ok(Ok(channel)) => {
                *self.stream.lock().await = Some(channel);
                self.consecutive_failures.store(0, Ordering::Relaxed);
                *self.phase.lock() = Phase::Streaming;
                tracing::info!("stream channel established");
            }
            Ok(Err(err)) => self.note_connect_failure(err).await,
            Err(_) => self.note_connect_failure(AgentError::Transient("stream connect timed out".into())).await,
        }
    }

    async fn note_connect_failure(&self, err: AgentError) {
        tracing::debug!(%err, "stream connect attempt failed");
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= MAX_CONNECT_FAILURES {
            *self.phase.lock() = Phase::HttpOnly;
            *self.last_http_only_entry.lock() = Some(std::time::Instant::now());
            tracing::warn!(failures, "falling back to HTTP-only after repeated stream failures");
            return;
        }
        *self.phase.lock() = Phase::Disconnected;
        let backoff = capped_backoff_with_jitter(failures);
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(backoff) => {}
        }
    }

    /// HTTP_ONLY -> CONNECTING on a timer, to periodically re-probe the
    /// stream channel.
    pub async fn maybe_reprobe_stream(&self) {
        let should_reprobe = {
            let phase = *self.phase.lock();
            if phase != Phase::HttpOnly {
                return;
            }
            let last = *self.last_http_only_entry.lock();
            match last {
                Some(at) => at.elapsed() >= self.config.stream_reconnect_probe(),
                None => true,
            }
        };
        if should_reprobe {
            *self.phase.lock() = Phase::Disconnected;
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.ensure_connected().await;
        }
    }

    /// Ship up to `batch_size()` events over whichever channel is active.
    pub async fn ship(&self, events: &[PendingEvent]) -> Result<ShipOutcome, AgentError> {
        self.ensure_connected().await;
        match self.current_channel() {
            Channel::Stream => self.ship_via_stream(events).await,
            Channel::Http => self.ship_via_http(events).await,
        }
    }

    async fn ship_via_stream(&self, events: &[PendingEvent]) -> Result<ShipOutcome, AgentError> {
        let mut guard = self.stream.lock().await;
        let Some(channel) = guard.as_mut() else {
            return self.ship_via_http(events).await;
        };

        match channel.send_batch(events).await {
            Ok(ack) => Ok(ack),
            Err(err) => {
                tracing::warn!(%err, "stream send failed, falling back to reconnect");
                *guard = None;
                drop(guard);
                *self.phase.lock() = Phase::Disconnected;
                Err(err)
            }
        }
    }

    async fn ship_via_http(&self, events: &[PendingEvent]) -> Result<ShipOutcome, AgentError> {
        let mut acked = Vec::new();
        let mut failed = Vec::new();
        for event in events {
            match self.http.send_one(event).await {
                Ok(()) => acked.push(event.id),
                Err(AgentError::Schema(reason)) => failed.push((event.id, reason)),
                Err(other) => return Err(other),
            }
            tokio::time::sleep(self.config.http_pacing()).await;
        }
        Ok(ShipOutcome { acked_ids: acked, failed })
    }

    /// Send the agent's half of the bidirectional heartbeat over the stream
    /// channel, if one is connected. A no-op on the HTTP-only phase, since
    /// HTTP has no persistent connection to keep alive.
    pub async fn send_heartbeat(&self) {
        let mut guard = self.stream.lock().await;
        let Some(channel) = guard.as_ref() else { return };
        if let Err(err) = channel.send_heartbeat().await {
            tracing::warn!(%err, "stream heartbeat send failed, reconnecting");
            *guard = None;
            drop(guard);
            *self.phase.lock() = Phase::Disconnected;
        }
    }

    /// Whether the stream channel has missed its heartbeat window, forcing
    /// a reconnect.
    pub async fn check_heartbeat(&self) {
        let mut guard = self.stream.lock().await;
        if let Some(channel) = guard.as_ref() {
            if channel.last_heartbeat_age() > HEARTBEAT_WINDOW {
                tracing::warn!("missed stream heartbeat window, reconnecting");
                *guard = None;
                drop(guard);
                *self.phase.lock() = Phase::Disconnected;
            }
        }
    }

    /// Tear down whichever channel is live, within the supervisor's bound.
    pub async fn shutdown(&self) {
        if let Some(channel) = self.stream.lock().await.take() {
            channel.close().await;
        }
        *self.phase.lock() = Phase::Disconnected;
    }
}

fn capped_backoff_with_jitter(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE.saturating_mul(1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX));
    let capped = exp.min(BACKOFF_CAP);
    let jitter_ms = rand::thread_rng().gen_range(0..=capped.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

pub(crate) fn to_wire_payload(event: &PendingEvent) -> EventPayload {
    EventPayload {
        event: event.event_kind.as_str().to_owned(),
        subject: event.subject.clone(),
        title: event.title.clone(),
        principal: event.principal.clone(),
        machine: event.machine.clone(),
        client_id: event.id,
        client_timestamp: format_rfc3339(event.client_timestamp),
        extra: serde_json::Map::new(),
    }
}

fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| ts.to_string())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
