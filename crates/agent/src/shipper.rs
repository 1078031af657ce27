// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shipper Loop: drains the durable queue through the
//! transport multiplexer, acking on success, retrying on partial failure,
//! and raising back-pressure when the queue grows past its watermark.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::queue::PersistentQueue;
use crate::transport::TransportMultiplexer;

/// How long to idle when the queue is empty before checking again.
const IDLE_POLL: Duration = Duration::from_millis(500);

pub struct Shipper {
    config: Arc<AgentConfig>,
    queue: Arc<PersistentQueue>,
    transport: Arc<TransportMultiplexer>,
    backpressure: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Shipper {
    pub fn new(
        config: Arc<AgentConfig>,
        queue: Arc<PersistentQueue>,
        transport: Arc<TransportMultiplexer>,
        backpressure: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) -> Self {
        Self { config, queue, transport, backpressure, cancel }
    }

    /// Long-lived loop; returns when cancelled.
    pub async fn run(&self) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            self.transport.maybe_reprobe_stream().await;
            self.transport.check_heartbeat().await;

            match self.drain_once().await {
                DrainResult::Idle => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(IDLE_POLL) => {}
                    }
                }
                DrainResult::Throttled(retry_after) => {
                    let delay = retry_after.map(Duration::from_secs).unwrap_or(Duration::from_secs(5));
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                DrainResult::TransportError | DrainResult::Shipped => {}
            }

            self.update_backpressure();
            if let Err(err) = self.queue.prune_if_over_cap(self.config.queue_soft_cap, self.config.queue_prune_threshold) {
                tracing::error!(%err, "queue pruning failed");
            }
        }
    }

    /// Drive the queue to empty (or a deadline), for `beacon-agent drain`.
    pub async fn drain_until(&self, deadline: std::time::Instant) -> u64 {
        while self.queue.size() > 0 && std::time::Instant::now() < deadline {
            self.transport.maybe_reprobe_stream().await;
            match self.drain_once().await {
                DrainResult::Throttled(retry_after) => {
                    tokio::time::sleep(Duration::from_secs(retry_after.unwrap_or(5))).await;
                }
                DrainResult::Idle => break,
                DrainResult::Shipped | DrainResult::TransportError => {}
            }
        }
        self.queue.size()
    }

    async fn drain_once(&self) -> DrainResult {
        let batch = self.queue.peek_batch(self.transport.batch_size());
        if batch.is_empty() {
            return DrainResult::Idle;
        }

        match self.transport.ship(&batch).await {
            Ok(outcome) => {
                if let Err(err) = self.queue.ack(&outcome.acked_ids) {
                    tracing::error!(%err, "failed to ack shipped events");
                }
                for (id, reason) in outcome.failed {
                    if let Err(err) = self.queue.record_failure(id, reason, self.config.retry_ceiling) {
                        tracing::error!(%err, "failed to record delivery failure");
                    }
                }
                DrainResult::Shipped
            }
            Err(AgentError::Policy { retry_after_secs }) => DrainResult::Throttled(retry_after_secs),
            Err(AgentError::Schema(reason)) => {
                for event in &batch {
                    if let Err(err) = self.queue.record_failure(event.id, reason.clone(), 0) {
                        tracing::error!(%err, "failed to record schema-rejected event for dead-letter");
                    }
                }
                DrainResult::Shipped
            }
            Err(err) => {
                tracing::debug!(%err, "transport error while shipping batch; will retry");
                DrainResult::TransportError
            }
        }
    }

    fn update_backpressure(&self) {
        let over = self.queue.size() > self.config.backpressure_watermark;
        self.backpressure.store(over, Ordering::Relaxed);
    }
}

enum DrainResult {
    Idle,
    Shipped,
    Throttled(Option<u64>),
    TransportError,
}
