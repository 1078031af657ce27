// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use time::OffsetDateTime;
use uuid::Uuid;

use beacon_common::{Event, EventKind, SourceChannel, TenantId};

use crate::store::{EventStore, InsertOutcome};
use crate::user::{User, UserStore};

fn sample_event(tenant_id: TenantId, principal: &str) -> Event {
    Event {
        tenant_id,
        event_kind: EventKind::WindowFocus,
        subject: "chrome.exe".into(),
        title: None,
        principal: Some(principal.to_owned()),
        machine: None,
        client_id: Uuid::new_v4(),
        client_timestamp: OffsetDateTime::now_utc(),
        server_receive_timestamp: OffsetDateTime::now_utc(),
        source_channel: SourceChannel::Http,
    }
}

#[test]
fn event_store_never_returns_another_tenants_events() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EventStore::open(dir.path().join("events.jsonl")).expect("open");
    let a = TenantId::new();
    let b = TenantId::new();
    store.try_insert(sample_event(a, "a\\alice")).expect("insert");
    store.try_insert(sample_event(b, "b\\bob")).expect("insert");

    let a_events = store.list_for_tenant(a);
    assert_eq!(a_events.len(), 1);
    assert!(a_events.iter().all(|e| e.tenant_id == a));
}

#[test]
fn identical_principal_string_does_not_cross_tenants() {
    // Two tenants happen to use the same directory naming convention;
    // attribution for one must never resolve into the other's user.
    let users = UserStore::new();
    let a = TenantId::new();
    let b = TenantId::new();
    let user_a = beacon_common::UserId::new();
    users.insert_user(User {
        id: user_a,
        tenant_id: a,
        email: "alice@tenant-a.example".into(),
        display_name: "Alice".into(),
        license_tags: vec![],
        last_activity: None,
    });
    users.insert_identity(a, "shared\\identifier".into(), user_a);

    // Tenant b has never registered this identifier, so attribution
    // must land as Unresolved, never silently hitting tenant a's user.
    let outcome = users.attribute_event(
        b,
        Some("shared\\identifier"),
        EventKind::WindowFocus,
        "chrome.exe",
        OffsetDateTime::now_utc(),
        OffsetDateTime::now_utc(),
    );
    assert_eq!(outcome, crate::user::AttributionOutcome::Unresolved);
    assert!(users.get_user(b, user_a).is_none());
}

#[test]
fn duplicate_client_id_across_tenants_is_not_a_duplicate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EventStore::open(dir.path().join("events.jsonl")).expect("open");
    let a = TenantId::new();
    let b = TenantId::new();
    let client_id = Uuid::new_v4();

    let mut event_a = sample_event(a, "a\\alice");
    event_a.client_id = client_id;
    let mut event_b = sample_event(b, "b\\bob");
    event_b.client_id = client_id;

    assert_eq!(store.try_insert(event_a).expect("insert"), InsertOutcome::Inserted);
    assert_eq!(store.try_insert(event_b).expect("insert"), InsertOutcome::Inserted);
}
