// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-side error taxonomy and CLI exit codes.

use std::fmt;

/// The six error classes an agent distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Network timeout, 5xx, stream drop — retried with backoff, never
    /// surfaced to the operator.
    Transient(String),
    /// Unauthenticated / revoked api-key — shipping halts, sampler keeps
    /// running to preserve the queue.
    Credential(String),
    /// Throttled — honor retry-after, slow the sampler, never drop events.
    Policy { retry_after_secs: Option<u64> },
    /// Invalid-schema / payload-too-large — terminal, event moves to
    /// dead-letter with the reason attached.
    Schema(String),
    /// Durable queue I/O failure — agent enters degraded mode.
    LocalStorage(String),
    /// Bad configuration — logged, process exits, no crash loop.
    FatalConfig(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(m) => write!(f, "transient: {m}"),
            Self::Credential(m) => write!(f, "credential: {m}"),
            Self::Policy { retry_after_secs } => {
                write!(f, "throttled, retry after {retry_after_secs:?}s")
            }
            Self::Schema(m) => write!(f, "schema: {m}"),
            Self::LocalStorage(m) => write!(f, "local-storage: {m}"),
            Self::FatalConfig(m) => write!(f, "configuration: {m}"),
        }
    }
}

impl std::error::Error for AgentError {}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    ConfigurationError = 2,
    Unauthenticated = 3,
    Unreachable = 4,
    Internal = 5,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&AgentError> for ExitCode {
    fn from(err: &AgentError) -> Self {
        match err {
            AgentError::FatalConfig(_) => ExitCode::ConfigurationError,
            AgentError::Credential(_) => ExitCode::Unauthenticated,
            AgentError::Transient(_) => ExitCode::Unreachable,
            AgentError::Policy { .. } => ExitCode::Unreachable,
            AgentError::Schema(_) | AgentError::LocalStorage(_) => ExitCode::Internal,
        }
    }
}
