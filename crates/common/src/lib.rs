// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared types for the beacon telemetry pipeline: the wire-format `Event`,
//! tenant/user identifiers, the cross-crate error taxonomy, and the
//! fingerprinting used by the agent-side deduplicator.

pub mod error;
pub mod event;
pub mod fingerprint;
pub mod ids;

pub use error::ErrorCode;
pub use event::{Event, EventKind, EventPayload, SourceChannel};
pub use ids::{TenantId, UserId};

/// HTTP header carrying the opaque tenant api-key (see DESIGN.md).
pub const CREDENTIAL_HEADER: &str = "X-Beacon-Api-Key";
