// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the sampler, deduplicator, durable queue, transport multiplexer,
//! and shipper loop together, and implements the CLI subcommands.
//! Orchestration and shutdown ordering follow `crates/cli/src/run.rs`'s
//! `prepare`/`run` split and `tracing_subscriber` init pattern.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::dedup::Deduplicator;
use crate::error::{AgentError, ExitCode};
use crate::queue::PersistentQueue;
use crate::sampler::observer::{PlatformObserver, SimulatedObserver};
use crate::sampler::Sampler;
use crate::shipper::Shipper;
use crate::transport::{TransportMultiplexer, HEARTBEAT_SEND_INTERVAL};

/// Bounded deadline for orderly shutdown: sampler stops first,
/// then the shipper flushes up to this deadline, then the queue closes.
const SHUTDOWN_DRAIN_DEADLINE: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .try_init();
}

struct Wiring {
    queue: Arc<PersistentQueue>,
    transport: Arc<TransportMultiplexer>,
    sampler: Arc<Sampler>,
    shipper: Arc<Shipper>,
    backpressure: Arc<AtomicBool>,
    cancel: CancellationToken,
}

fn wire(config: Arc<AgentConfig>, cancel: CancellationToken) -> Result<Wiring, AgentError> {
    let queue = Arc::new(PersistentQueue::open(&config.data_dir)?);
    let client_id = Uuid::new_v4();
    let transport = Arc::new(TransportMultiplexer::new(Arc::clone(&config), client_id, cancel.clone())?);
    let dedup = Arc::new(Deduplicator::new(config.suppression_window()));
    let backpressure = Arc::new(AtomicBool::new(false));
    // No real platform backend in this environment; a real agent swaps this for an OS-specific observer.
    let observer: Arc<dyn PlatformObserver> = Arc::new(SimulatedObserver::idle());
    let sampler = Arc::new(Sampler::new(
        Arc::clone(&config),
        observer,
        Arc::clone(&dedup),
        Arc::clone(&queue),
        Arc::clone(&backpressure),
        cancel.clone(),
    ));
    let shipper = Arc::new(Shipper::new(
        Arc::clone(&config),
        Arc::clone(&queue),
        Arc::clone(&transport),
        Arc::clone(&backpressure),
        cancel.clone(),
    ));

    Ok(Wiring { queue, transport, sampler, shipper, backpressure: backpressure, cancel })
}

/// Periodic heartbeat clock: the agent's half of the bidirectional stream
/// heartbeat. One worker, ticking independently of the shipper's own
/// drain/backoff pacing.
fn spawn_heartbeat_clock(transport: Arc<TransportMultiplexer>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEARTBEAT_SEND_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => transport.send_heartbeat().await,
            }
        }
    })
}

/// `beacon-agent run`.
pub async fn run(config: AgentConfig) -> ExitCode {
    let config = Arc::new(config);
    let cancel = CancellationToken::new();

    let wiring = match wire(Arc::clone(&config), cancel.clone()) {
        Ok(w) => w,
        Err(err) => {
            tracing::error!(%err, "failed to initialize agent");
            return ExitCode::from(&err);
        }
    };

    let sampler_handles = wiring.sampler.clone().spawn();
    let shipper_task = {
        let shipper = Arc::clone(&wiring.shipper);
        tokio::spawn(async move { shipper.run().await })
    };
    let heartbeat_task = spawn_heartbeat_clock(Arc::clone(&wiring.transport), wiring.cancel.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining");
        }
        _ = wiring.cancel.cancelled() => {}
    }

    // Sampler stops first.
    wiring.cancel.cancel();
    for handle in sampler_handles {
        let _ = handle.await;
    }

    // Shipper flushes up to the bounded deadline.
    let deadline = std::time::Instant::now() + SHUTDOWN_DRAIN_DEADLINE;
    let _ = tokio::time::timeout(SHUTDOWN_DRAIN_DEADLINE, wiring.shipper.drain_until(deadline)).await;
    let _ = shipper_task.await;
    let _ = heartbeat_task.await;
    wiring.transport.shutdown().await;

    let remaining = wiring.queue.size();
    if remaining > 0 {
        tracing::warn!(remaining, "shutting down with events still queued; durable state preserved for next run");
    }

    ExitCode::Success
}

/// `beacon-agent test-connection`.
pub async fn test_connection(config: AgentConfig) -> ExitCode {
    let health_url = format!("{}/health", config.api_url.trim_end_matches('/'));
    let http = match crate::transport::http::HttpChannel::new(&config) {
        Ok(h) => h,
        Err(err) => {
            tracing::error!(%err, "failed to build http client");
            return ExitCode::from(&err);
        }
    };
    match http.probe(&health_url).await {
        Ok(()) => {
            println!("ok: {health_url} reachable");
            ExitCode::Success
        }
        Err(err) => {
            eprintln!("unreachable: {err}");
            ExitCode::from(&err)
        }
    }
}

/// `beacon-agent show-queue`.
pub fn show_queue(config: AgentConfig) -> ExitCode {
    match PersistentQueue::open(&config.data_dir) {
        Ok(queue) => {
            let snapshot = queue.snapshot();
            println!("pending: {}", snapshot.pending);
            println!("dead_letter: {}", snapshot.dead_letter);
            ExitCode::Success
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

/// `beacon-agent drain --timeout=<seconds>`.
pub async fn drain(config: AgentConfig, timeout_seconds: u64) -> ExitCode {
    let config = Arc::new(config);
    let cancel = CancellationToken::new();
    let wiring = match wire(Arc::clone(&config), cancel) {
        Ok(w) => w,
        Err(err) => {
            tracing::error!(%err, "failed to initialize agent for drain");
            return ExitCode::from(&err);
        }
    };

    let deadline = std::time::Instant::now() + Duration::from_secs(timeout_seconds);
    let remaining = wiring.shipper.drain_until(deadline).await;
    wiring.transport.shutdown().await;
    let _ = wiring.backpressure;

    if remaining == 0 {
        println!("drained");
        ExitCode::Success
    } else {
        println!("timed out with {remaining} events still queued");
        ExitCode::Unreachable
    }
}
