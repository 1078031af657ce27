// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router assembly. Grounded on
//! `crates/mux/src/transport/mod.rs`'s `build_router`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_layer;
use crate::ingest;
use crate::state::AppState;
use crate::ws::ws_ingest;

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(ingest::health))
        .route("/ingest", post(ingest::ingest))
        .route("/ingest-batch", post(ingest::ingest_batch).layer(DefaultBodyLimit::max(max_body_bytes)))
        .route("/ws/ingest", get(ws_ingest))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth_layer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
