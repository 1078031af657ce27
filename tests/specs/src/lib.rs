// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `beacon-server` and `beacon-agent` binaries as
//! subprocesses and exercises the ingestion path over HTTP end to end.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::time::Duration;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times — only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

fn workspace_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    manifest.parent().and_then(|p| p.parent()).map(Path::to_path_buf).unwrap_or(manifest.to_path_buf())
}

pub fn server_binary() -> PathBuf {
    workspace_root().join("target").join("debug").join("beacon-server")
}

pub fn agent_binary() -> PathBuf {
    workspace_root().join("target").join("debug").join("beacon-agent")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `beacon-server` process, killed on drop. Seeds one tenant
/// from a generated tenants file so tests have a known api-key to use.
pub struct ServerProcess {
    child: Child,
    port: u16,
    pub api_key: String,
    _data_dir: tempfile::TempDir,
}

impl ServerProcess {
    pub fn start() -> anyhow::Result<Self> {
        ensure_crypto();
        let binary = server_binary();
        anyhow::ensure!(binary.exists(), "beacon-server binary not found at {}", binary.display());

        let port = free_port()?;
        let data_dir = tempfile::tempdir()?;
        let api_key = uuid::Uuid::new_v4().to_string();
        let tenant_id = uuid::Uuid::new_v4();

        let tenants_file = data_dir.path().join("tenants.json");
        let now = time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339)?;
        std::fs::write(
            &tenants_file,
            serde_json::json!([{
                "id": tenant_id,
                "display_name": "Smoke Test Tenant",
                "contact_email": "it@smoke-test.example",
                "api_key": api_key,
                "created_at": now,
                "rate_limit_class": { "kind": "standard" },
                "deleted_at": null,
            }])
            .to_string(),
        )?;

        let child = Command::new(&binary)
            .args([
                "--host",
                "127.0.0.1",
                "--port",
                &port.to_string(),
                "--events-path",
                data_dir.path().join("events.jsonl").to_string_lossy().as_ref(),
                "--tenants-file",
                tenants_file.to_string_lossy().as_ref(),
            ])
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, port, api_key, _data_dir: data_dir })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("beacon-server did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Run `beacon-agent` as a one-shot subcommand (`test-connection`,
/// `show-queue`, `drain`) against a running server and return its exit code.
pub fn run_agent_subcommand(server: &ServerProcess, data_dir: &Path, subcommand: &[&str]) -> anyhow::Result<i32> {
    ensure_crypto();
    let binary = agent_binary();
    anyhow::ensure!(binary.exists(), "beacon-agent binary not found at {}", binary.display());

    let mut args: Vec<String> = vec![
        "--api-url".into(),
        server.base_url(),
        "--api-key".into(),
        server.api_key.clone(),
        "--data-dir".into(),
        data_dir.to_string_lossy().into_owned(),
    ];
    args.extend(subcommand.iter().map(|s| s.to_string()));

    let status = Command::new(&binary).args(&args).stdout(Stdio::null()).stderr(Stdio::null()).status()?;
    Ok(status.code().unwrap_or(-1))
}
