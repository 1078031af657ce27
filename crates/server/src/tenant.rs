// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant (Account) storage. Grounded on the registry shape of
//! `crates/mux/src/state.rs`'s `sessions` map, keyed here by both id and
//! api-key so credential resolution is a single lookup.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use beacon_common::TenantId;

/// Rate-limit class assigned to a tenant, a variant rather
/// than a bare number so an out-of-scope admin surface can assign other
/// classes later without changing the token-bucket machinery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateLimitClass {
    Standard,
    Elevated,
    Custom { capacity: u32, refill_per_minute: u32 },
}

impl RateLimitClass {
    pub fn capacity(&self) -> u32 {
        match self {
            Self::Standard => 600,
            Self::Elevated => 3_000,
            Self::Custom { capacity, .. } => *capacity,
        }
    }

    pub fn refill_per_minute(&self) -> u32 {
        match self {
            Self::Standard => 600,
            Self::Elevated => 3_000,
            Self::Custom { refill_per_minute, .. } => *refill_per_minute,
        }
    }
}

impl Default for RateLimitClass {
    fn default() -> Self {
        Self::Standard
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub display_name: String,
    pub contact_email: String,
    pub api_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub rate_limit_class: RateLimitClass,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<TenantId, Tenant>,
    by_api_key: HashMap<String, TenantId>,
}

/// In-memory tenant registry. Every read/write takes `tenant_id` or
/// `api_key` explicitly; there is no path that infers a tenant from
/// request-body content.
pub struct TenantStore {
    inner: RwLock<Inner>,
}

impl TenantStore {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    pub fn insert(&self, tenant: Tenant) {
        let mut inner = self.inner.write();
        inner.by_api_key.insert(tenant.api_key.clone(), tenant.id);
        inner.by_id.insert(tenant.id, tenant);
    }

    /// Resolve an opaque api-key to its owning, active tenant. A
    /// soft-deleted tenant's key resolves to `None`, same as an unknown key.
    pub fn resolve_api_key(&self, api_key: &str) -> Option<TenantId> {
        let inner = self.inner.read();
        let tenant_id = *inner.by_api_key.get(api_key)?;
        let tenant = inner.by_id.get(&tenant_id)?;
        tenant.is_active().then_some(tenant_id)
    }

    pub fn get(&self, tenant_id: TenantId) -> Option<Tenant> {
        self.inner.read().by_id.get(&tenant_id).cloned()
    }

    /// Rotate a tenant's api-key: the old key is invalidated atomically
    /// with the new one becoming active.
    pub fn rotate_api_key(&self, tenant_id: TenantId, new_key: String) -> Result<(), TenantError> {
        let mut inner = self.inner.write();
        let old_key = {
            let tenant = inner.by_id.get_mut(&tenant_id).ok_or(TenantError::NotFound)?;
            let old = tenant.api_key.clone();
            tenant.api_key = new_key.clone();
            old
        };
        inner.by_api_key.remove(&old_key);
        inner.by_api_key.insert(new_key, tenant_id);
        Ok(())
    }

    pub fn soft_delete(&self, tenant_id: TenantId, now: OffsetDateTime) -> Result<(), TenantError> {
        let mut inner = self.inner.write();
        let tenant = inner.by_id.get_mut(&tenant_id).ok_or(TenantError::NotFound)?;
        tenant.deleted_at = Some(now);
        Ok(())
    }
}

impl Default for TenantStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantError {
    NotFound,
}

#[cfg(test)]
#[path = "tenant_tests.rs"]
mod tests;
