// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared server state. Grounded on `crates/mux/src/state.rs`'s
//! `MuxState`: one value threaded through axum's `State` extractor, owning
//! every piece of shared mutable state the handlers touch.

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::store::EventStore;
use crate::tenant::TenantStore;
use crate::user::UserStore;

pub struct AppState {
    pub config: ServerConfig,
    pub tenants: TenantStore,
    pub users: UserStore,
    pub rate_limiter: RateLimiter,
    pub events: EventStore,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig, tenants: TenantStore, events: EventStore) -> Self {
        Self {
            config,
            tenants,
            users: UserStore::new(),
            rate_limiter: RateLimiter::new(),
            events,
            shutdown: CancellationToken::new(),
        }
    }
}
