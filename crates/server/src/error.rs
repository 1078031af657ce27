// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps the shared [`beacon_common::ErrorCode`] taxonomy onto axum
//! responses. Grounded on `crates/mux/src/error.rs`'s `MuxError` /
//! `IntoResponse` pairing, generalized to carry an optional `retry_after`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use beacon_common::error::{ErrorCode, ErrorResponse};

#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), retry_after: None }
    }

    pub fn throttled(retry_after_secs: u64) -> Self {
        Self { code: ErrorCode::Throttled, message: "rate limit exceeded".to_owned(), retry_after: Some(retry_after_secs) }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.code.to_error_body(self.message), retry_after: self.retry_after };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            if let Ok(value) = axum::http::HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}
