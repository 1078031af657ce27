// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingestion server configuration. Mirrors the agent's clap+env idiom
//! (`crates/agent/src/config.rs`).

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "beacon-server", version, about = "Multi-tenant telemetry ingestion server.")]
pub struct ServerConfig {
    /// Address to bind the HTTP/WS listener on.
    #[arg(long, env = "BEACON_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "BEACON_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Durable append-only event log path.
    #[arg(long, env = "BEACON_EVENTS_PATH", default_value = "./beacon-server-data/events.jsonl")]
    pub events_path: PathBuf,

    /// JSON array of tenants to seed the registry with at startup. A
    /// pragmatic stand-in for the explicitly out-of-scope admin CRUD
    /// surface — operators provision tenants by
    /// editing this file and restarting, rather than through a live API.
    #[arg(long, env = "BEACON_TENANTS_FILE")]
    pub tenants_file: Option<PathBuf>,

    /// Maximum events accepted in one `POST /ingest-batch` call.
    #[arg(long, env = "BEACON_MAX_BATCH_EVENTS", default_value_t = 500)]
    pub max_batch_events: usize,

    /// Maximum total body size accepted by the ingestion endpoints, in
    /// bytes.
    #[arg(long, env = "BEACON_MAX_BODY_BYTES", default_value_t = 1_000_000)]
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.host, self.port)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_batch_events == 0 {
            anyhow::bail!("--max-batch-events must be greater than zero");
        }
        Ok(())
    }
}
