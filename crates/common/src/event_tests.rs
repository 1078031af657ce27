// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn payload(event: &str) -> EventPayload {
    EventPayload {
        event: event.to_owned(),
        subject: "Photoshop".to_owned(),
        title: None,
        principal: Some("ACME\\alice".to_owned()),
        machine: Some("ACME-WS01".to_owned()),
        client_id: Uuid::new_v4(),
        client_timestamp: "2026-01-01T12:00:00Z".to_owned(),
        extra: serde_json::Map::new(),
    }
}

#[test]
fn normalizes_known_event() {
    let tenant = TenantId::new();
    let now = OffsetDateTime::now_utc();
    let event = normalize(payload("application-usage"), tenant, SourceChannel::Http, now)
        .expect("valid payload");
    assert_eq!(event.event_kind, EventKind::ApplicationUsage);
    assert_eq!(event.tenant_id, tenant);
}

#[test]
fn rejects_unknown_event_kind() {
    let err = normalize(payload("teleport"), TenantId::new(), SourceChannel::Http, OffsetDateTime::now_utc())
        .unwrap_err();
    assert_eq!(err, ValidationError::UnknownEventKind("teleport".to_owned()));
}

#[test]
fn rejects_oversized_subject() {
    let mut p = payload("application-usage");
    p.subject = "x".repeat(SUBJECT_MAX_BYTES + 1);
    let err = normalize(p, TenantId::new(), SourceChannel::Http, OffsetDateTime::now_utc()).unwrap_err();
    assert_eq!(err, ValidationError::SubjectTooLarge);
}

#[test]
fn lowercases_web_visit_domain_only() {
    let mut p = payload("web-visit");
    p.subject = "https://Example.COM/Path?Q=1".to_owned();
    let event = normalize(p, TenantId::new(), SourceChannel::Http, OffsetDateTime::now_utc())
        .expect("valid payload");
    assert_eq!(event.subject, "https://example.com/Path?Q=1");
}

#[test]
fn rejects_bad_timestamp() {
    let mut p = payload("application-usage");
    p.client_timestamp = "not-a-date".to_owned();
    let err = normalize(p, TenantId::new(), SourceChannel::Http, OffsetDateTime::now_utc()).unwrap_err();
    assert_eq!(err, ValidationError::BadTimestamp);
}
