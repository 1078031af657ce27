// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin entry point wiring an accepted [`Event`] into the [`UserStore`]'s
//! attribution step. Kept separate from `user.rs` so the ingestion handler
//! has one call per step, while the transactional lock scope itself lives
//! with the data it guards.

use time::OffsetDateTime;

use beacon_common::Event;

use crate::user::{AttributionOutcome, UserStore};

pub struct AttributionWriter<'a> {
    users: &'a UserStore,
}

impl<'a> AttributionWriter<'a> {
    pub fn new(users: &'a UserStore) -> Self {
        Self { users }
    }

    pub fn attribute(&self, event: &Event, now: OffsetDateTime) -> AttributionOutcome {
        self.users.attribute_event(
            event.tenant_id,
            event.principal.as_deref(),
            event.event_kind,
            &event.subject,
            event.client_timestamp,
            now,
        )
    }
}
