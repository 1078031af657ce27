// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant Isolation Guard. This module carries no runtime logic of its
//! own — isolation is structural, enforced by every storage type
//! requiring `tenant_id` as a first-class parameter (see
//! [`crate::tenant::TenantStore`],
//! [`crate::user::UserStore`], [`crate::store::EventStore`]). What lives
//! here is the cross-cutting test harness asserting that discipline holds
//! end to end, exercising the same stores the HTTP/WS handlers use.

#[cfg(test)]
#[path = "isolation_tests.rs"]
mod tests;
