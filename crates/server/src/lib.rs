// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-tenant telemetry ingestion server: auth, rate limiting,
//! validation/normalization, idempotent durable writes, and attribution.

pub mod attribution;
pub mod auth;
pub mod config;
pub mod error;
pub mod ingest;
pub mod isolation;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod store;
pub mod tenant;
pub mod user;
pub mod ws;

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::store::EventStore;
use crate::tenant::TenantStore;

/// Seed the tenant registry from `--tenants-file`, if configured (see
/// [`ServerConfig::tenants_file`] doc comment for why this stands in for
/// an admin CRUD surface).
fn load_tenants(config: &ServerConfig) -> anyhow::Result<TenantStore> {
    let store = TenantStore::new();
    if let Some(ref path) = config.tenants_file {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading tenants file {}: {e}", path.display()))?;
        let tenants: Vec<tenant::Tenant> = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("parsing tenants file {}: {e}", path.display()))?;
        for t in tenants {
            store.insert(t);
        }
    }
    Ok(store)
}

/// Run the ingestion server until shutdown.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;
    let addr = config.bind_addr();

    let tenants = load_tenants(&config)?;
    let events = EventStore::open(&config.events_path)?;
    let state = Arc::new(AppState::new(config, tenants, events));

    let shutdown = state.shutdown.clone();
    let router = router::build_router(Arc::clone(&state));

    tracing::info!(%addr, "beacon-server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}
