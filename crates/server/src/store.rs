// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, idempotent event storage: `(tenant-id, client-event-id)` is
//! always unique. Grounded on `crates/cli/src/event_log.rs`'s append-only
//! JSONL log: a write either lands once or is recognized as a duplicate
//! and dropped before it ever reaches disk.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use uuid::Uuid;

use beacon_common::{Event, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

struct Inner {
    file: std::fs::File,
    seen: HashSet<(TenantId, Uuid)>,
    events: Vec<Event>,
}

/// Append-only, idempotent event store. One process-wide instance; callers
/// always pass `tenant_id` as derived from the authenticated credential,
/// never from event-body content.
pub struct EventStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl EventStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).read(true).open(&path)?;
        let (seen, events) = recover(&path)?;
        Ok(Self { path, inner: Mutex::new(Inner { file, seen, events }) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a normalized event if its `(tenant_id, client_id)` pair has
    /// not been seen before; otherwise report the duplicate so the caller
    /// can still acknowledge the agent.
    pub fn try_insert(&self, event: Event) -> anyhow::Result<InsertOutcome> {
        let mut inner = self.inner.lock();
        let key = (event.tenant_id, event.client_id);
        if inner.seen.contains(&key) {
            return Ok(InsertOutcome::Duplicate);
        }

        let line = serde_json::to_string(&event)?;
        inner.file.write_all(line.as_bytes())?;
        inner.file.write_all(b"\n")?;
        inner.file.sync_data()?;

        inner.seen.insert(key);
        inner.events.push(event);
        Ok(InsertOutcome::Inserted)
    }

    pub fn list_for_tenant(&self, tenant_id: TenantId) -> Vec<Event> {
        self.inner.lock().events.iter().filter(|e| e.tenant_id == tenant_id).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn recover(path: &Path) -> anyhow::Result<(HashSet<(TenantId, Uuid)>, Vec<Event>)> {
    let mut seen = HashSet::new();
    let mut events = Vec::new();
    if !path.exists() {
        return Ok((seen, events));
    }
    let contents = std::fs::read_to_string(path)?;
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        // A half-written tail line (crash mid-append) is dropped rather
        // than treated as fatal corruption; earlier lines already parsed
        // successfully prove the file is otherwise intact.
        let Ok(event) = serde_json::from_str::<Event>(line) else {
            continue;
        };
        seen.insert((event.tenant_id, event.client_id));
        events.push(event);
    }
    Ok((seen, events))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
