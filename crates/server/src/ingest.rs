// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP ingestion handlers. Grounded on
//! `crates/mux/src/transport/http.rs`'s handler shape (state extraction,
//! `Json` request/response, `impl IntoResponse`).

use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use beacon_common::error::ErrorCode;
use beacon_common::{EventPayload, SourceChannel, TenantId};

use crate::attribution::AttributionWriter;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::InsertOutcome;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health` — no auth.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: bool,
    pub duplicate: bool,
}

/// `POST /ingest` — single-event ingestion.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Extension(tenant_id): Extension<TenantId>,
    Json(payload): Json<EventPayload>,
) -> Result<Json<IngestResponse>, ApiError> {
    let outcome = accept_event(&state, tenant_id, payload, SourceChannel::Http)?;
    Ok(Json(IngestResponse {
        accepted: true,
        duplicate: matches!(outcome, InsertOutcome::Duplicate),
    }))
}

#[derive(Debug, Deserialize)]
pub struct IngestBatchRequest {
    pub events: Vec<EventPayload>,
}

#[derive(Debug, Serialize)]
pub struct BatchFailureBody {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct IngestBatchResponse {
    pub processed: usize,
    pub failed: usize,
    pub failures: Vec<BatchFailureBody>,
}

/// `POST /ingest-batch` — bounded batch ingestion.
pub async fn ingest_batch(
    State(state): State<Arc<AppState>>,
    Extension(tenant_id): Extension<TenantId>,
    Json(request): Json<IngestBatchRequest>,
) -> Result<Json<IngestBatchResponse>, ApiError> {
    if request.events.len() > state.config.max_batch_events {
        return Err(ApiError::new(
            ErrorCode::PayloadTooLarge,
            format!("batch exceeds {} events", state.config.max_batch_events),
        ));
    }

    let mut failures = Vec::new();
    let mut processed = 0usize;
    for (index, payload) in request.events.into_iter().enumerate() {
        match accept_event(&state, tenant_id, payload, SourceChannel::Http) {
            Ok(_) => processed += 1,
            Err(err) => failures.push(BatchFailureBody { index, reason: err.message }),
        }
    }

    Ok(Json(IngestBatchResponse { processed, failed: failures.len(), failures }))
}

/// Steps 3-7 of the ingestion contract shared by HTTP and stream callers:
/// validate/normalize, idempotent durable write, attribution handoff.
/// Steps 1 (credential resolution) and 2 (rate limit) happen in the caller
/// — the HTTP path via [`crate::auth::auth_layer`] plus an explicit check
/// here, the stream path in its handshake and per-batch loop.
pub fn accept_event(
    state: &AppState,
    tenant_id: TenantId,
    payload: EventPayload,
    channel: SourceChannel,
) -> Result<InsertOutcome, ApiError> {
    let now = OffsetDateTime::now_utc();

    let Some(tenant) = state.tenants.get(tenant_id) else {
        return Err(ApiError::new(ErrorCode::Unauthenticated, "unknown tenant"));
    };

    match state.rate_limiter.try_consume(
        tenant_id,
        crate::rate_limit::BucketKind::Ingest,
        tenant.rate_limit_class,
        1,
        std::time::Instant::now(),
    ) {
        crate::rate_limit::RateLimitOutcome::Allowed => {}
        crate::rate_limit::RateLimitOutcome::Throttled { retry_after_secs } => {
            return Err(ApiError::throttled(retry_after_secs));
        }
    }

    let event = beacon_common::event::normalize(payload, tenant_id, channel, now)
        .map_err(|e| ApiError::new(ErrorCode::InvalidSchema, e.to_string()))?;

    let outcome = state.events.try_insert(event.clone()).map_err(|e| ApiError::internal(e.to_string()))?;

    if outcome == InsertOutcome::Inserted {
        AttributionWriter::new(&state.users).attribute(&event, now);
    }

    Ok(outcome)
}
