// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the ingestion HTTP API.
//!
//! Uses `axum_test::TestServer` -- no real TCP needed.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use axum_test::TestServer;
use time::OffsetDateTime;

use beacon_common::CREDENTIAL_HEADER;
use beacon_server::config::ServerConfig;
use beacon_server::router::build_router;
use beacon_server::state::AppState;
use beacon_server::store::EventStore;
use beacon_server::tenant::{RateLimitClass, Tenant, TenantStore};

fn test_config(events_path: PathBuf) -> ServerConfig {
    ServerConfig {
        host: std::net::IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        events_path,
        tenants_file: None,
        max_batch_events: 500,
        max_body_bytes: 1_000_000,
    }
}

fn seeded_tenant(api_key: &str) -> Tenant {
    Tenant {
        id: beacon_common::TenantId::new(),
        display_name: "Acme".into(),
        contact_email: "it@acme.example".into(),
        api_key: api_key.to_owned(),
        created_at: OffsetDateTime::now_utc(),
        rate_limit_class: RateLimitClass::Standard,
        deleted_at: None,
    }
}

fn test_server(dir: &tempfile::TempDir, api_key: &str) -> (TestServer, Arc<AppState>) {
    let tenants = TenantStore::new();
    tenants.insert(seeded_tenant(api_key));

    let events = EventStore::open(dir.path().join("events.jsonl")).expect("open event store");
    let state = Arc::new(AppState::new(test_config(dir.path().join("events.jsonl")), tenants, events));

    let router = build_router(Arc::clone(&state));
    (TestServer::new(router).expect("failed to create test server"), state)
}

fn cred(api_key: &str) -> (axum::http::HeaderName, axum::http::HeaderValue) {
    (
        axum::http::HeaderName::from_bytes(CREDENTIAL_HEADER.as_bytes()).expect("valid header name"),
        axum::http::HeaderValue::from_str(api_key).expect("valid header value"),
    )
}

fn event_body(client_id: uuid::Uuid) -> serde_json::Value {
    serde_json::json!({
        "event": "window-focus",
        "subject": "chrome.exe",
        "title": "Example Tab",
        "clientId": client_id,
        "clientTimestamp": OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .expect("format timestamp"),
    })
}

#[tokio::test]
async fn health_requires_no_auth() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (server, _state) = test_server(&dir, "key-a");
    let resp = server.get("/health").await;
    resp.assert_status_ok();
}

#[tokio::test]
async fn ingest_without_credential_is_unauthenticated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (server, _state) = test_server(&dir, "key-a");
    let resp = server.post("/ingest").json(&event_body(uuid::Uuid::new_v4())).await;
    resp.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ingest_with_valid_credential_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (server, state) = test_server(&dir, "key-a");
    let resp = server
        .post("/ingest")
        .add_header(cred("key-a").0, cred("key-a").1)
        .json(&event_body(uuid::Uuid::new_v4()))
        .await;
    resp.assert_status_ok();

    let body: serde_json::Value = resp.json();
    assert_eq!(body["accepted"], true);
    assert_eq!(body["duplicate"], false);
    assert_eq!(state.events.len(), 1);
}

#[tokio::test]
async fn duplicate_client_id_is_acknowledged_but_not_double_stored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (server, state) = test_server(&dir, "key-a");
    let client_id = uuid::Uuid::new_v4();

    server.post("/ingest").add_header(cred("key-a").0, cred("key-a").1).json(&event_body(client_id)).await.assert_status_ok();
    let resp = server.post("/ingest").add_header(cred("key-a").0, cred("key-a").1).json(&event_body(client_id)).await;
    resp.assert_status_ok();

    let body: serde_json::Value = resp.json();
    assert_eq!(body["duplicate"], true);
    assert_eq!(state.events.len(), 1);
}

#[tokio::test]
async fn batch_exceeding_max_events_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (server, _state) = test_server(&dir, "key-a");

    let events: Vec<serde_json::Value> = (0..501).map(|_| event_body(uuid::Uuid::new_v4())).collect();
    let resp = server
        .post("/ingest-batch")
        .add_header(cred("key-a").0, cred("key-a").1)
        .json(&serde_json::json!({ "events": events }))
        .await;
    resp.assert_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn invalid_event_kind_is_rejected_with_invalid_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (server, _state) = test_server(&dir, "key-a");
    let mut body = event_body(uuid::Uuid::new_v4());
    body["event"] = serde_json::Value::String("not-a-real-kind".into());

    let resp = server.post("/ingest").add_header(cred("key-a").0, cred("key-a").1).json(&body).await;
    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
}
