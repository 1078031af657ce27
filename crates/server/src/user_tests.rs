// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn ts(secs: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(secs).expect("valid timestamp")
}

#[test]
fn attribution_advances_last_activity_monotonically() {
    let store = UserStore::new();
    let tenant_id = TenantId::new();
    let user_id = UserId::new();
    store.insert_user(User {
        id: user_id,
        tenant_id,
        email: "alice@acme.example".into(),
        display_name: "Alice".into(),
        license_tags: vec!["Photoshop".into()],
        last_activity: None,
    });
    store.insert_identity(tenant_id, "ACME\\alice".into(), user_id);

    store.attribute_event(tenant_id, Some("ACME\\alice"), EventKind::WindowFocus, "chrome.exe", ts(100), ts(100));
    store.attribute_event(tenant_id, Some("ACME\\alice"), EventKind::WindowFocus, "chrome.exe", ts(50), ts(150));

    let user = store.get_user(tenant_id, user_id).expect("user exists");
    assert_eq!(user.last_activity, Some(ts(100)), "must not rewind on an out-of-order event");
}

#[test]
fn unknown_principal_creates_unresolved_not_a_phantom_user() {
    let store = UserStore::new();
    let tenant_id = TenantId::new();
    let outcome =
        store.attribute_event(tenant_id, Some("ACME\\bob"), EventKind::WindowFocus, "chrome.exe", ts(1), ts(1));
    assert_eq!(outcome, AttributionOutcome::Unresolved);
    assert_eq!(store.unresolved_identities(tenant_id).len(), 1);
}

#[test]
fn license_usage_counter_increments_only_for_known_application() {
    let store = UserStore::new();
    let tenant_id = TenantId::new();
    let user_id = UserId::new();
    store.insert_user(User {
        id: user_id,
        tenant_id,
        email: "alice@acme.example".into(),
        display_name: "Alice".into(),
        license_tags: vec!["Photoshop".into()],
        last_activity: None,
    });
    store.insert_identity(tenant_id, "ACME\\alice".into(), user_id);

    store.attribute_event(tenant_id, Some("ACME\\alice"), EventKind::ApplicationUsage, "Photoshop", ts(1), ts(1));
    store.attribute_event(tenant_id, Some("ACME\\alice"), EventKind::ApplicationUsage, "Notepad", ts(2), ts(2));

    assert_eq!(store.usage_count(tenant_id, user_id, "Photoshop"), 1);
    assert_eq!(store.usage_count(tenant_id, user_id, "Notepad"), 0);
}
