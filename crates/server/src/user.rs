// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User / EndpointIdentity storage and the Attribution Writer. Every
//! entry point is keyed first by `tenant_id`, structurally (a per-tenant
//! sub-map) rather than just by convention, so a missing or forged tenant
//! scope simply has nothing to look up.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use beacon_common::{EventKind, TenantId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    pub display_name: String,
    pub license_tags: Vec<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_activity: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointIdentity {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub identifier: String,
    pub machine_hint: Option<String>,
}

/// An observed principal with no matching `EndpointIdentity` — surfaced to
/// an out-of-scope admin "unclaimed" list rather than silently creating a
/// phantom user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedIdentity {
    pub tenant_id: TenantId,
    pub identifier: String,
    pub machine_hint: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub first_seen: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
    pub occurrences: u64,
}

/// Result of running the Attribution Writer over one accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributionOutcome {
    Attributed { user_id: UserId },
    Unresolved,
    /// The event kind does not drive attribution.
    NotApplicable,
}

#[derive(Default)]
struct TenantUsers {
    users: HashMap<UserId, User>,
    identities: HashMap<String, UserId>,
    unresolved: HashMap<String, UnresolvedIdentity>,
    usage_counters: HashMap<(UserId, String), u64>,
}

#[derive(Default)]
struct Inner {
    tenants: HashMap<TenantId, TenantUsers>,
}

pub struct UserStore {
    inner: Mutex<Inner>,
}

impl UserStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    pub fn insert_user(&self, user: User) {
        let mut inner = self.inner.lock();
        inner.tenants.entry(user.tenant_id).or_default().users.insert(user.id, user);
    }

    pub fn insert_identity(&self, tenant_id: TenantId, identifier: String, user_id: UserId) {
        let mut inner = self.inner.lock();
        inner.tenants.entry(tenant_id).or_default().identities.insert(identifier, user_id);
    }

    pub fn get_user(&self, tenant_id: TenantId, user_id: UserId) -> Option<User> {
        self.inner.lock().tenants.get(&tenant_id)?.users.get(&user_id).cloned()
    }

    pub fn unresolved_identities(&self, tenant_id: TenantId) -> Vec<UnresolvedIdentity> {
        self.inner
            .lock()
            .tenants
            .get(&tenant_id)
            .map(|t| t.unresolved.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn usage_count(&self, tenant_id: TenantId, user_id: UserId, app: &str) -> u64 {
        self.inner
            .lock()
            .tenants
            .get(&tenant_id)
            .and_then(|t| t.usage_counters.get(&(user_id, app.to_owned())))
            .copied()
            .unwrap_or(0)
    }

    /// Run the full attribution step for one accepted event under a single
    /// lock acquisition, so last-activity advance and usage-counter
    /// increment can never be observed half-applied.
    pub fn attribute_event(
        &self,
        tenant_id: TenantId,
        principal: Option<&str>,
        event_kind: EventKind,
        subject: &str,
        client_timestamp: OffsetDateTime,
        now: OffsetDateTime,
    ) -> AttributionOutcome {
        let mut inner = self.inner.lock();
        let tenant_users = inner.tenants.entry(tenant_id).or_default();

        let Some(principal) = principal else {
            return AttributionOutcome::NotApplicable;
        };

        let Some(&user_id) = tenant_users.identities.get(principal) else {
            if event_kind.drives_attribution() {
                let entry = tenant_users
                    .unresolved
                    .entry(principal.to_owned())
                    .or_insert_with(|| UnresolvedIdentity {
                        tenant_id,
                        identifier: principal.to_owned(),
                        machine_hint: None,
                        first_seen: now,
                        last_seen: now,
                        occurrences: 0,
                    });
                entry.last_seen = now;
                entry.occurrences += 1;
                return AttributionOutcome::Unresolved;
            }
            return AttributionOutcome::NotApplicable;
        };

        if !event_kind.drives_attribution() {
            return AttributionOutcome::NotApplicable;
        }

        if let Some(user) = tenant_users.users.get_mut(&user_id) {
            // Conditional max update, never a rewind.
            user.last_activity = Some(match user.last_activity {
                Some(existing) if existing >= client_timestamp => existing,
                _ => client_timestamp,
            });

            if event_kind == EventKind::ApplicationUsage
                && user.license_tags.iter().any(|tag| tag.eq_ignore_ascii_case(subject))
            {
                *tenant_users.usage_counters.entry((user_id, subject.to_owned())).or_insert(0) += 1;
            }
        }

        AttributionOutcome::Attributed { user_id }
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "user_tests.rs"]
mod tests;
