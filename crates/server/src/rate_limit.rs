// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tenant token-bucket rate limiting. Grounded on
//! `crates/agent`'s `transport` backoff bookkeeping for the lazy-refill
//! idiom, and on `crates/mux/src/state.rs`'s bounded, LRU-evicted resident
//! map for the capacity discipline.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;

use beacon_common::TenantId;

use crate::tenant::RateLimitClass;

/// Maximum number of tenant buckets kept resident at once.
/// Beyond this the least-recently-touched bucket is evicted; it is
/// recreated at full capacity on the tenant's next request, which is a
/// harmless one-time grant rather than an unbounded leak.
pub const MAX_RESIDENT_BUCKETS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed,
    Throttled { retry_after_secs: u64 },
}

/// Which surface is consuming tokens. Ingestion and interactive-UI actions
/// get separate buckets so a tenant's event stream can't starve its own
/// dashboard, even though only `Ingest` is exercised today — the
/// interactive-UI surface is out of scope for this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    Ingest,
    Interactive,
}

type BucketKey = (TenantId, BucketKind);

struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(class: RateLimitClass, now: Instant) -> Self {
        let capacity = f64::from(class.capacity());
        Self { capacity, refill_per_sec: f64::from(class.refill_per_minute()) / 60.0, tokens: capacity, last_refill: now }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self, cost: f64, now: Instant) -> RateLimitOutcome {
        self.refill(now);
        if self.tokens >= cost {
            self.tokens -= cost;
            return RateLimitOutcome::Allowed;
        }
        let deficit = cost - self.tokens;
        let wait_secs = if self.refill_per_sec > 0.0 { (deficit / self.refill_per_sec).ceil() } else { 1.0 };
        RateLimitOutcome::Throttled { retry_after_secs: wait_secs.max(1.0) as u64 }
    }
}

pub struct RateLimiter {
    buckets: Mutex<IndexMap<BucketKey, TokenBucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { buckets: Mutex::new(IndexMap::new()) }
    }

    pub fn try_consume(
        &self,
        tenant_id: TenantId,
        kind: BucketKind,
        class: RateLimitClass,
        cost: u32,
        now: Instant,
    ) -> RateLimitOutcome {
        let key = (tenant_id, kind);
        let mut buckets = self.buckets.lock();

        // Move-to-end on touch so eviction below drops the coldest tenant.
        let bucket = if let Some(bucket) = buckets.shift_remove(&key) {
            bucket
        } else {
            TokenBucket::new(class, now)
        };
        buckets.insert(key, bucket);

        if buckets.len() > MAX_RESIDENT_BUCKETS {
            buckets.shift_remove_index(0);
        }

        let bucket = buckets.get_mut(&key).expect("just inserted");
        bucket.try_consume(f64::from(cost), now)
    }

    pub fn resident_count(&self) -> usize {
        self.buckets.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
