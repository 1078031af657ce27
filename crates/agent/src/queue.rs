// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent Queue.
//!
//! A single append-mostly log at `<data-dir>/queue.log`. Each record is
//! framed as `[u32 length][u32 crc32][json body]`, grounded on
//! `crates/cli/src/event_log.rs`'s append-only JSONL log, extended with
//! length+CRC framing for crash-safe recovery. Acks are tombstone records
//! appended to the same log (never an in-place rewrite mid-operation);
//! periodic compaction rewrites the log with only live records using the
//! write-tmp-then-rename pattern from `crates/mux/src/credential/persist.rs`.
//!
//! All mutations go through a single `parking_lot::Mutex`-guarded writer:
//! exactly one writer for the durable log at a time.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use beacon_common::EventKind;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AgentError;

/// An event buffered locally until the server acknowledges it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub id: Uuid,
    pub event_kind: EventKind,
    pub subject: String,
    pub title: Option<String>,
    pub principal: Option<String>,
    pub machine: Option<String>,
    pub client_timestamp: OffsetDateTime,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingEventRecord {
    id: Uuid,
    event_kind: EventKind,
    subject: String,
    title: Option<String>,
    principal: Option<String>,
    machine: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    client_timestamp: OffsetDateTime,
    retry_count: u32,
    last_error: Option<String>,
}

impl From<&PendingEvent> for PendingEventRecord {
    fn from(e: &PendingEvent) -> Self {
        Self {
            id: e.id,
            event_kind: e.event_kind,
            subject: e.subject.clone(),
            title: e.title.clone(),
            principal: e.principal.clone(),
            machine: e.machine.clone(),
            client_timestamp: e.client_timestamp,
            retry_count: e.retry_count,
            last_error: e.last_error.clone(),
        }
    }
}

impl From<PendingEventRecord> for PendingEvent {
    fn from(r: PendingEventRecord) -> Self {
        Self {
            id: r.id,
            event_kind: r.event_kind,
            subject: r.subject,
            title: r.title,
            principal: r.principal,
            machine: r.machine,
            client_timestamp: r.client_timestamp,
            retry_count: r.retry_count,
            last_error: r.last_error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum WireRecord {
    Insert(PendingEventRecord),
    Tombstone { id: Uuid },
}

struct Inner {
    file: File,
    /// Live records in insertion order. Ack/tombstone removes from here.
    order: IndexMap<Uuid, PendingEvent>,
    dead_letter_file: File,
    dead_letter: IndexMap<Uuid, PendingEvent>,
    tombstones_since_compaction: u64,
}

/// Crash-safe on-disk FIFO of pending events.
pub struct PersistentQueue {
    path: PathBuf,
    dead_letter_path: PathBuf,
    inner: Mutex<Inner>,
}

const COMPACT_AFTER_TOMBSTONES: u64 = 256;

impl PersistentQueue {
    /// Open (or create) the durable queue at `data_dir/queue.log`, recovering
    /// any state left from a previous run.
    pub fn open(data_dir: &Path) -> Result<Self, AgentError> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| AgentError::LocalStorage(format!("creating data dir: {e}")))?;
        let path = data_dir.join("queue.log");
        let dead_letter_path = data_dir.join("dead_letter.jsonl");

        let order = recover(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AgentError::LocalStorage(format!("opening queue log: {e}")))?;
        let dead_letter_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&dead_letter_path)
            .map_err(|e| AgentError::LocalStorage(format!("opening dead-letter log: {e}")))?;
        let dead_letter = recover_dead_letter(&dead_letter_path)?;

        Ok(Self {
            path,
            dead_letter_path,
            inner: Mutex::new(Inner {
                file,
                order,
                dead_letter_file,
                dead_letter,
                tombstones_since_compaction: 0,
            }),
        })
    }

    /// Append an event, returning only after a durable write.
    pub fn enqueue(&self, event: PendingEvent) -> Result<(), AgentError> {
        let mut inner = self.inner.lock();
        let record = WireRecord::Insert(PendingEventRecord::from(&event));
        write_frame(&mut inner.file, &record)?;
        inner.order.insert(event.id, event);
        Ok(())
    }

    /// Return the oldest up to `max` live events, without removing them.
    pub fn peek_batch(&self, max: usize) -> Vec<PendingEvent> {
        let inner = self.inner.lock();
        inner.order.values().take(max).cloned().collect()
    }

    /// Remove the given ids; safe to call with ids from a prior peek even
    /// across restarts (they are simply no longer present).
    pub fn ack(&self, ids: &[Uuid]) -> Result<(), AgentError> {
        let mut inner = self.inner.lock();
        for id in ids {
            if inner.order.shift_remove(id).is_some() {
                write_frame(&mut inner.file, &WireRecord::Tombstone { id: *id })?;
                inner.tombstones_since_compaction += 1;
            }
        }
        if inner.tombstones_since_compaction >= COMPACT_AFTER_TOMBSTONES {
            self.compact_locked(&mut inner)?;
        }
        Ok(())
    }

    /// Record a failed delivery attempt. Past the retry ceiling, the event
    /// moves to the dead-letter region.
    pub fn record_failure(&self, id: Uuid, error: String, retry_ceiling: u32) -> Result<(), AgentError> {
        let mut inner = self.inner.lock();
        let Some(mut event) = inner.order.shift_remove(&id) else {
            return Ok(());
        };
        event.retry_count += 1;
        event.last_error = Some(error);

        if event.retry_count > retry_ceiling {
            write_frame(&mut inner.file, &WireRecord::Tombstone { id })?;
            inner.tombstones_since_compaction += 1;
            let line = serde_json::to_string(&PendingEventRecord::from(&event))
                .map_err(|e| AgentError::LocalStorage(format!("serializing dead-letter entry: {e}")))?;
            writeln_durable(&mut inner.dead_letter_file, &line)?;
            inner.dead_letter.insert(id, event);
        } else {
            write_frame(&mut inner.file, &WireRecord::Tombstone { id })?;
            write_frame(&mut inner.file, &WireRecord::Insert(PendingEventRecord::from(&event)))?;
            inner.tombstones_since_compaction += 1;
            inner.order.insert(id, event);
        }
        Ok(())
    }

    /// Current count of live (shippable) events.
    pub fn size(&self) -> u64 {
        self.inner.lock().order.len() as u64
    }

    /// Current count of dead-lettered events.
    pub fn dead_letter_count(&self) -> u64 {
        self.inner.lock().dead_letter.len() as u64
    }

    /// Enforce the soft-cap pruning policy: once
    /// the live depth exceeds `soft_cap`, drop the oldest previously-retried
    /// events until the depth is back to `prune_threshold`. Never-yet-tried
    /// events are preserved so a fresh backlog isn't thrown away; new events
    /// are always admitted regardless of this policy.
    pub fn prune_if_over_cap(&self, soft_cap: u64, prune_threshold: u64) -> Result<u64, AgentError> {
        let mut inner = self.inner.lock();
        if (inner.order.len() as u64) <= soft_cap {
            return Ok(0);
        }
        let retried_ids: Vec<Uuid> = inner
            .order
            .iter()
            .filter(|(_, e)| e.retry_count > 0)
            .map(|(id, _)| *id)
            .collect();

        let mut pruned = 0u64;
        for id in retried_ids {
            if (inner.order.len() as u64) <= prune_threshold {
                break;
            }
            if inner.order.shift_remove(&id).is_some() {
                write_frame(&mut inner.file, &WireRecord::Tombstone { id })?;
                inner.tombstones_since_compaction += 1;
                pruned += 1;
            }
        }
        if inner.tombstones_since_compaction >= COMPACT_AFTER_TOMBSTONES {
            self.compact_locked(&mut inner)?;
        }
        Ok(pruned)
    }

    /// Rewrite the log with only live records (write-tmp-then-rename,
    /// matching `crates/mux/src/credential/persist.rs::save`).
    pub fn compact(&self) -> Result<(), AgentError> {
        let mut inner = self.inner.lock();
        self.compact_locked(&mut inner)
    }

    fn compact_locked(&self, inner: &mut Inner) -> Result<(), AgentError> {
        let tmp_path = self.path.with_extension("log.tmp");
        let mut tmp = File::create(&tmp_path)
            .map_err(|e| AgentError::LocalStorage(format!("creating compaction tmp file: {e}")))?;
        for event in inner.order.values() {
            write_frame(&mut tmp, &WireRecord::Insert(PendingEventRecord::from(event)))?;
        }
        tmp.sync_all().map_err(|e| AgentError::LocalStorage(format!("syncing compaction tmp file: {e}")))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| AgentError::LocalStorage(format!("renaming compacted queue log: {e}")))?;
        inner.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AgentError::LocalStorage(format!("reopening queue log after compaction: {e}")))?;
        inner.tombstones_since_compaction = 0;
        Ok(())
    }

    pub fn dead_letter_path(&self) -> &Path {
        &self.dead_letter_path
    }
}

fn write_frame(file: &mut File, record: &WireRecord) -> Result<(), AgentError> {
    let body = serde_json::to_vec(record)
        .map_err(|e| AgentError::LocalStorage(format!("serializing queue record: {e}")))?;
    let crc = crc32fast::hash(&body);
    let len = body.len() as u32;
    file.write_all(&len.to_le_bytes())
        .and_then(|_| file.write_all(&crc.to_le_bytes()))
        .and_then(|_| file.write_all(&body))
        .and_then(|_| file.sync_all())
        .map_err(|e| AgentError::LocalStorage(format!("writing queue record: {e}")))
}

fn writeln_durable(file: &mut File, line: &str) -> Result<(), AgentError> {
    file.write_all(line.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .and_then(|_| file.sync_all())
        .map_err(|e| AgentError::LocalStorage(format!("writing dead-letter record: {e}")))
}

/// Replay the on-disk log, applying tombstones, and truncate a corrupted
/// tail. Corruption earlier than the tail is a fatal, operator-visible
/// error.
fn recover(path: &Path) -> Result<IndexMap<Uuid, PendingEvent>, AgentError> {
    if !path.exists() {
        return Ok(IndexMap::new());
    }
    let mut file = File::open(path).map_err(|e| AgentError::LocalStorage(format!("opening queue log: {e}")))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| AgentError::LocalStorage(format!("reading queue log: {e}")))?;
    drop(file);

    let mut order: IndexMap<Uuid, PendingEvent> = IndexMap::new();
    let mut pos = 0usize;
    let total = bytes.len();

    while pos < total {
        if total - pos < 8 {
            truncate_at(path, pos)?;
            break;
        }
        let len = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap_or_default()) as usize;
        let crc = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap_or_default());
        let body_start = pos + 8;
        let body_end = body_start.saturating_add(len);

        if body_end > total {
            truncate_at(path, pos)?;
            break;
        }
        let body = &bytes[body_start..body_end];
        if crc32fast::hash(body) != crc {
            if body_end == total {
                // Corruption at the very tail: truncate and move on.
                truncate_at(path, pos)?;
                break;
            }
            return Err(AgentError::LocalStorage(format!(
                "queue log corrupted at byte offset {pos} (not at tail) — operator intervention required"
            )));
        }

        match serde_json::from_slice::<WireRecord>(body) {
            Ok(WireRecord::Insert(record)) => {
                order.insert(record.id, record.into());
            }
            Ok(WireRecord::Tombstone { id }) => {
                order.shift_remove(&id);
            }
            Err(_) if body_end == total => {
                truncate_at(path, pos)?;
                break;
            }
            Err(e) => {
                return Err(AgentError::LocalStorage(format!(
                    "queue log record at offset {pos} failed to parse: {e}"
                )));
            }
        }

        pos = body_end;
    }

    Ok(order)
}

fn truncate_at(path: &Path, pos: usize) -> Result<(), AgentError> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| AgentError::LocalStorage(format!("opening queue log for truncation: {e}")))?;
    file.set_len(pos as u64).map_err(|e| AgentError::LocalStorage(format!("truncating queue log: {e}")))?;
    let mut f = file;
    f.seek(SeekFrom::End(0)).map_err(|e| AgentError::LocalStorage(format!("seeking queue log: {e}")))?;
    Ok(())
}

fn recover_dead_letter(path: &Path) -> Result<IndexMap<Uuid, PendingEvent>, AgentError> {
    if !path.exists() {
        return Ok(IndexMap::new());
    }
    let contents =
        std::fs::read_to_string(path).map_err(|e| AgentError::LocalStorage(format!("reading dead-letter log: {e}")))?;
    let mut map = IndexMap::new();
    for line in contents.lines() {
        if let Ok(record) = serde_json::from_str::<PendingEventRecord>(line) {
            let event: PendingEvent = record.into();
            map.insert(event.id, event);
        }
    }
    Ok(map)
}

/// Snapshot used by `beacon-agent show-queue`.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub pending: u64,
    pub dead_letter: u64,
}

impl PersistentQueue {
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot { pending: self.size(), dead_letter: self.dead_letter_count() }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
