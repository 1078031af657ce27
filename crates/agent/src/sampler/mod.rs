// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local Activity Sampler.
//!
//! Three independent tickers — focus/web-visit, process-scan, network-scan —
//! each structured on the `tokio::select!` + `CancellationToken` pattern
//! from `crates/mux/src/upstream/poller.rs`. Candidate events go straight
//! through the deduplicator and, if admitted, onto the durable queue; there
//! is no separate channel hop, since both of those are already cheap-lock-
//! guarded shared state rather than actors with their own inbox.

pub mod browser;
pub mod observer;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beacon_common::EventKind;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::dedup::Deduplicator;
use crate::queue::{PendingEvent, PersistentQueue};
use observer::PlatformObserver;

/// How long a continuously-running process must stay running before its
/// `application-usage` event re-arms. Not an operator-facing option, so it
/// is an internal constant rather than a CLI flag.
const PROCESS_REARM_RESET: Duration = Duration::from_secs(5 * 60);

pub struct Sampler {
    config: Arc<AgentConfig>,
    observer: Arc<dyn PlatformObserver>,
    dedup: Arc<Deduplicator>,
    queue: Arc<PersistentQueue>,
    /// Set by the shipper loop when queue depth crosses the back-pressure
    /// watermark; the sampler doubles its period while set.
    backpressure: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Sampler {
    pub fn new(
        config: Arc<AgentConfig>,
        observer: Arc<dyn PlatformObserver>,
        dedup: Arc<Deduplicator>,
        queue: Arc<PersistentQueue>,
        backpressure: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) -> Self {
        Self { config, observer, dedup, queue, backpressure, cancel }
    }

    fn effective_period(&self, base: Duration) -> Duration {
        if self.backpressure.load(Ordering::Relaxed) {
            base.saturating_mul(2)
        } else {
            base
        }
    }

    fn enqueue_candidate(
        &self,
        kind: EventKind,
        subject: String,
        title: Option<String>,
        principal: Option<String>,
        machine: Option<String>,
        now: OffsetDateTime,
    ) {
        if !self.dedup.admit(kind, &subject, title.as_deref(), principal.as_deref(), now) {
            return;
        }
        let pending = PendingEvent {
            id: Uuid::new_v4(),
            event_kind: kind,
            subject,
            title,
            principal,
            machine,
            client_timestamp: now,
            retry_count: 0,
            last_error: None,
        };
        if let Err(err) = self.queue.enqueue(pending) {
            tracing::error!(%err, "failed to enqueue sampled event; sampler continues, event is lost");
        }
    }

    /// Spawn the sampler's background tickers. Returns their join handles so
    /// the supervisor can await orderly shutdown.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(self.clone().run_focus_and_web_visit()),
            tokio::spawn(self.clone().run_process_scan()),
            tokio::spawn(self.clone().run_network_scan()),
        ]
    }

    async fn run_focus_and_web_visit(self: Arc<Self>) {
        let mut previous: Option<(String, String)> = None;
        loop {
            let period = self.effective_period(self.config.sample_period());
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(period) => {}
            }

            let Some(focus) = self.observer.foreground_window() else {
                // Locked workstation / no active session: no focus event,
                // and the "previous" tuple resets so a later resume is
                // treated as a fresh focus change.
                previous = None;
                continue;
            };
            let now = OffsetDateTime::now_utc();
            let tuple = (focus.process_name.clone(), focus.title.clone());
            if previous.as_ref() != Some(&tuple) {
                self.enqueue_candidate(
                    EventKind::WindowFocus,
                    focus.process_name.clone(),
                    Some(focus.title.clone()),
                    None,
                    None,
                    now,
                );
                previous = Some(tuple);
            }

            if browser::is_known_browser(&focus.process_name) {
                if let Some(subject) = browser::extract_subject(&focus.process_name, &focus.title) {
                    self.enqueue_candidate(EventKind::WebVisit, subject, None, None, None, now);
                }
            }
        }
    }

    async fn run_process_scan(self: Arc<Self>) {
        // name -> last time an event was emitted for its current continuous run.
        let mut running: HashMap<String, OffsetDateTime> = HashMap::new();
        loop {
            let period = self.effective_period(self.config.sample_period());
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(period) => {}
            }

            let now = OffsetDateTime::now_utc();
            let observed = self.observer.running_processes();
            let observed_names: std::collections::HashSet<&str> =
                observed.iter().map(|p| p.name.as_str()).collect();
            running.retain(|name, _| observed_names.contains(name.as_str()));

            for process in &observed {
                if !self.config.application_allow_list.iter().any(|a| a.eq_ignore_ascii_case(&process.name)) {
                    continue;
                }
                match running.get(&process.name) {
                    None => {
                        self.enqueue_candidate(EventKind::ApplicationLaunch, process.name.clone(), None, None, None, now);
                        running.insert(process.name.clone(), now);
                    }
                    Some(last_emitted) if now - *last_emitted >= signed(PROCESS_REARM_RESET) => {
                        self.enqueue_candidate(EventKind::ApplicationUsage, process.name.clone(), None, None, None, now);
                        running.insert(process.name.clone(), now);
                    }
                    Some(_) => {}
                }
            }
        }
    }

    async fn run_network_scan(self: Arc<Self>) {
        loop {
            let period = self.effective_period(self.config.network_period());
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(period) => {}
            }

            let now = OffsetDateTime::now_utc();
            for conn in self.observer.established_connections() {
                // Per-remote-endpoint rate limiting is delegated to the
                // deduplicator: repeat observations of the same endpoint
                // within the suppression window are collapsed there rather
                // than tracked separately here.
                let subject = format!("{}:{}", conn.remote_addr, conn.remote_port);
                self.enqueue_candidate(EventKind::NetworkConnection, subject, None, None, None, now);
            }
        }
    }
}

fn signed(d: Duration) -> time::Duration {
    time::Duration::try_from(d).unwrap_or(time::Duration::MAX)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
