// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential resolution middleware. Grounded on
//! `crates/mux/src/transport/auth.rs`'s `auth_layer`, generalized from a
//! single shared bearer token to a per-tenant api-key lookup. The resolved
//! `TenantId` is attached to request extensions; nothing downstream ever
//! re-derives a tenant from the request body.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use beacon_common::error::ErrorCode;
use beacon_common::CREDENTIAL_HEADER;

use crate::error::ApiError;
use crate::state::AppState;

/// Paths that do not require a resolved tenant. The stream endpoint
/// authenticates via its own handshake payload instead of this header.
fn is_exempt(path: &str) -> bool {
    path == "/health" || path.starts_with("/ws/")
}

pub async fn auth_layer(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    if is_exempt(&path) {
        return next.run(req).await;
    }

    let api_key = req
        .headers()
        .get(CREDENTIAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let Some(api_key) = api_key else {
        return unauthorized();
    };

    let Some(tenant_id) = state.tenants.resolve_api_key(&api_key) else {
        return unauthorized();
    };

    req.extensions_mut().insert(tenant_id);
    next.run(req).await
}

fn unauthorized() -> Response {
    ApiError::new(ErrorCode::Unauthenticated, "missing or invalid credential").into_response()
}
