// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingestion error taxonomy, shared between the server
//! (which emits these) and the agent (which interprets them to decide retry
//! policy).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse error classes surfaced by the ingestion endpoint. Never carries
/// internal-state detail beyond this taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Unauthenticated,
    Throttled,
    InvalidSchema,
    PayloadTooLarge,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Throttled => 429,
            Self::InvalidSchema => 400,
            Self::PayloadTooLarge => 413,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Throttled => "THROTTLED",
            Self::InvalidSchema => "INVALID_SCHEMA",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether an agent should retry delivery of the same event after
    /// receiving this error. Schema-class errors are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled | Self::Internal)
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error response envelope returned by the ingestion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    /// Present only for `Throttled`: advisory seconds before retrying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Error body with a machine-readable code and a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
