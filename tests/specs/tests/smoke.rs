// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `beacon-server` and
//! `beacon-agent` binaries and exercise the ingestion path over HTTP.

use std::time::Duration;

use beacon_specs::ServerProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn health_endpoint_reports_ok() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value = reqwest::get(format!("{}/health", server.base_url())).await?.json().await?;
    assert_eq!(resp["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn ingest_without_credential_is_rejected() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/ingest", server.base_url()))
        .json(&serde_json::json!({
            "event": "window-focus",
            "subject": "chrome.exe",
            "clientId": uuid::Uuid::new_v4(),
            "clientTimestamp": now_rfc3339(),
        }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 401);
    Ok(())
}

#[tokio::test]
async fn ingest_with_valid_credential_is_accepted_and_idempotent() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let client_id = uuid::Uuid::new_v4();
    let body = serde_json::json!({
        "event": "window-focus",
        "subject": "chrome.exe",
        "clientId": client_id,
        "clientTimestamp": now_rfc3339(),
    });

    let first: serde_json::Value = client
        .post(format!("{}/ingest", server.base_url()))
        .header("X-Beacon-Api-Key", &server.api_key)
        .json(&body)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(first["accepted"], true);
    assert_eq!(first["duplicate"], false);

    let second: serde_json::Value = client
        .post(format!("{}/ingest", server.base_url()))
        .header("X-Beacon-Api-Key", &server.api_key)
        .json(&body)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(second["duplicate"], true);

    Ok(())
}

#[tokio::test]
async fn agent_drain_exits_cleanly_with_an_empty_queue() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let data_dir = tempfile::tempdir()?;
    let code = beacon_specs::run_agent_subcommand(&server, data_dir.path(), &["drain", "--timeout", "2"])?;
    assert_eq!(code, 0);

    Ok(())
}

#[tokio::test]
async fn agent_show_queue_reports_empty_queue_on_a_fresh_data_dir() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let data_dir = tempfile::tempdir()?;
    let code = beacon_specs::run_agent_subcommand(&server, data_dir.path(), &["show-queue"])?;
    assert_eq!(code, 0);

    Ok(())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
