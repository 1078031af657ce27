// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deduplicator: suppresses repeat observations of the same
//! fingerprint within a sliding window, bounded by a capacity-limited LRU
//! map so a pathological app/window churn can't grow this unbounded.
//!
//! Grounded on the bounded-recency pattern in
//! `crates/mux/src/upstream/health.rs` (tracking "last seen" per key),
//! adapted here to an `indexmap::IndexMap` for its move-to-end-on-touch LRU
//! behavior.

use std::time::Duration;

use beacon_common::fingerprint::Fingerprint;
use beacon_common::EventKind;
use indexmap::IndexMap;
use parking_lot::Mutex;
use time::OffsetDateTime;

const DEFAULT_CAPACITY: usize = 1024;

/// Suppresses repeat observations of the same fingerprint within a window.
pub struct Deduplicator {
    capacity: usize,
    window: Duration,
    entries: Mutex<IndexMap<Fingerprint, OffsetDateTime>>,
}

impl Deduplicator {
    pub fn new(window: Duration) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, window)
    }

    pub fn with_capacity(capacity: usize, window: Duration) -> Self {
        Self { capacity, window, entries: Mutex::new(IndexMap::with_capacity(capacity)) }
    }

    /// Returns `true` if this observation should be shipped, `false` if it's
    /// a repeat within the suppression window.
    pub fn admit(
        &self,
        kind: EventKind,
        subject: &str,
        title: Option<&str>,
        principal: Option<&str>,
        now: OffsetDateTime,
    ) -> bool {
        let fingerprint = Fingerprint::compute(kind, subject, title, principal);
        let mut entries = self.entries.lock();

        if let Some(last_seen) = entries.shift_remove(&fingerprint) {
            let elapsed = now - last_seen;
            let suppressed = elapsed >= time::Duration::ZERO && elapsed < signed(self.window);
            entries.insert(fingerprint, now);
            return !suppressed;
        }

        entries.insert(fingerprint, now);
        if entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn signed(d: Duration) -> time::Duration {
    time::Duration::try_from(d).unwrap_or(time::Duration::MAX)
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
