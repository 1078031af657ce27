// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use beacon_common::{EventKind, SourceChannel};
use time::OffsetDateTime;

fn sample_event(tenant_id: TenantId, client_id: Uuid) -> Event {
    Event {
        tenant_id,
        event_kind: EventKind::WindowFocus,
        subject: "chrome.exe".into(),
        title: None,
        principal: None,
        machine: None,
        client_id,
        client_timestamp: OffsetDateTime::now_utc(),
        server_receive_timestamp: OffsetDateTime::now_utc(),
        source_channel: SourceChannel::Http,
    }
}

#[test]
fn duplicate_client_id_is_rejected_not_double_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EventStore::open(dir.path().join("events.jsonl")).expect("open");
    let tenant_id = TenantId::new();
    let client_id = Uuid::new_v4();

    assert_eq!(store.try_insert(sample_event(tenant_id, client_id)).expect("insert"), InsertOutcome::Inserted);
    assert_eq!(store.try_insert(sample_event(tenant_id, client_id)).expect("insert"), InsertOutcome::Duplicate);
    assert_eq!(store.len(), 1);
}

#[test]
fn survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    let tenant_id = TenantId::new();
    let client_id = Uuid::new_v4();
    {
        let store = EventStore::open(&path).expect("open");
        store.try_insert(sample_event(tenant_id, client_id)).expect("insert");
    }
    let reopened = EventStore::open(&path).expect("reopen");
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.try_insert(sample_event(tenant_id, client_id)).expect("insert"), InsertOutcome::Duplicate);
}

#[test]
fn isolates_events_by_tenant() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EventStore::open(dir.path().join("events.jsonl")).expect("open");
    let a = TenantId::new();
    let b = TenantId::new();
    store.try_insert(sample_event(a, Uuid::new_v4())).expect("insert");
    store.try_insert(sample_event(b, Uuid::new_v4())).expect("insert");
    assert_eq!(store.list_for_tenant(a).len(), 1);
    assert_eq!(store.list_for_tenant(b).len(), 1);
}
