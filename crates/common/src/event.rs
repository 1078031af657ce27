// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wire-format `Event` and its validation/normalization
//! rules.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ids::TenantId;

/// Field caps enforced at ingestion.
pub const SUBJECT_MAX_BYTES: usize = 2 * 1024;
pub const TITLE_MAX_BYTES: usize = 4 * 1024;
pub const PRINCIPAL_MAX_BYTES: usize = 512;

/// Enumerated event kinds. `ApplicationLaunch` is the edge-triggered first
/// observation of a process run; `ApplicationUsage` is the re-armed
/// per-interval continuation of one still running (see `beacon-agent`'s
/// sampler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    ApplicationLaunch,
    ApplicationUsage,
    WindowFocus,
    WebVisit,
    NetworkConnection,
    AgentLifecycle,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationLaunch => "application-launch",
            Self::ApplicationUsage => "application-usage",
            Self::WindowFocus => "window-focus",
            Self::WebVisit => "web-visit",
            Self::NetworkConnection => "network-connection",
            Self::AgentLifecycle => "agent-lifecycle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "application-launch" => Some(Self::ApplicationLaunch),
            "application-usage" => Some(Self::ApplicationUsage),
            "window-focus" => Some(Self::WindowFocus),
            "web-visit" => Some(Self::WebVisit),
            "network-connection" => Some(Self::NetworkConnection),
            "agent-lifecycle" => Some(Self::AgentLifecycle),
            _ => None,
        }
    }

    /// Event kinds that drive attribution.
    pub fn drives_attribution(&self) -> bool {
        matches!(self, Self::ApplicationUsage | Self::WindowFocus | Self::WebVisit)
    }
}

/// Which transport delivered the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceChannel {
    Stream,
    Http,
}

impl SourceChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Http => "http",
        }
    }
}

/// The payload an agent sends for a single observation. Deliberately has no `tenant_id` field: the tenant
/// is resolved server-side from the credential, never from the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    pub client_id: Uuid,
    pub client_timestamp: String,
    /// Event-kind-specific extras. Unknown fields within are dropped
    /// silently at normalization time.
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A normalized, server-accepted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub tenant_id: TenantId,
    pub event_kind: EventKind,
    pub subject: String,
    pub title: Option<String>,
    pub principal: Option<String>,
    pub machine: Option<String>,
    pub client_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub client_timestamp: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub server_receive_timestamp: OffsetDateTime,
    pub source_channel: SourceChannel,
}

/// Validation failure reasons, reported back to the agent verbatim so the
/// dead-letter entry carries actionable context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UnknownEventKind(String),
    SubjectTooLarge,
    TitleTooLarge,
    PrincipalTooLarge,
    MissingSubject,
    BadTimestamp,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEventKind(k) => write!(f, "unknown event kind '{k}'"),
            Self::SubjectTooLarge => write!(f, "subject exceeds {SUBJECT_MAX_BYTES} bytes"),
            Self::TitleTooLarge => write!(f, "title exceeds {TITLE_MAX_BYTES} bytes"),
            Self::PrincipalTooLarge => write!(f, "principal exceeds {PRINCIPAL_MAX_BYTES} bytes"),
            Self::MissingSubject => write!(f, "subject is required"),
            Self::BadTimestamp => write!(f, "clientTimestamp is not a parseable ISO-8601 timestamp"),
        }
    }
}

/// Validate and normalize an inbound payload into a server-owned `Event`
///. `tenant_id` and `now` come from the caller so
/// this function has no ambient authority over tenant scoping or clocks.
pub fn normalize(
    payload: EventPayload,
    tenant_id: TenantId,
    channel: SourceChannel,
    now: OffsetDateTime,
) -> Result<Event, ValidationError> {
    let event_kind =
        EventKind::parse(&payload.event).ok_or_else(|| ValidationError::UnknownEventKind(payload.event.clone()))?;

    if payload.subject.trim().is_empty() {
        return Err(ValidationError::MissingSubject);
    }
    if payload.subject.len() > SUBJECT_MAX_BYTES {
        return Err(ValidationError::SubjectTooLarge);
    }
    if let Some(ref title) = payload.title {
        if title.len() > TITLE_MAX_BYTES {
            return Err(ValidationError::TitleTooLarge);
        }
    }
    if let Some(ref principal) = payload.principal {
        if principal.len() > PRINCIPAL_MAX_BYTES {
            return Err(ValidationError::PrincipalTooLarge);
        }
    }

    let client_timestamp = OffsetDateTime::parse(
        &payload.client_timestamp,
        &time::format_description::well_known::Rfc3339,
    )
    .map_err(|_| ValidationError::BadTimestamp)?;

    let mut subject = payload.subject.trim().to_owned();
    if event_kind == EventKind::WebVisit {
        subject = normalize_web_visit_subject(&subject);
    }

    Ok(Event {
        tenant_id,
        event_kind,
        subject,
        title: payload.title.map(|t| t.trim().to_owned()),
        principal: payload.principal.map(|p| p.trim().to_owned()),
        machine: payload.machine.map(|m| m.trim().to_owned()),
        client_id: payload.client_id,
        client_timestamp,
        server_receive_timestamp: now,
        source_channel: channel,
    })
}

/// Lower-case the domain portion of a web-visit subject, leaving the path
/// and query string untouched. Query-string stripping is deliberately
/// *not* performed here, to avoid silently dropping data an operator may
/// need (see DESIGN.md).
fn normalize_web_visit_subject(subject: &str) -> String {
    let (scheme_rest, rest) = match subject.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, subject),
    };
    let (host, tail) = match rest.split_once('/') {
        Some((host, tail)) => (host, Some(tail)),
        None => (rest, None),
    };
    let host = host.to_ascii_lowercase();
    match (scheme_rest, tail) {
        (Some(scheme), Some(tail)) => format!("{scheme}://{host}/{tail}"),
        (Some(scheme), None) => format!("{scheme}://{host}"),
        (None, Some(tail)) => format!("{host}/{tail}"),
        (None, None) => host,
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
