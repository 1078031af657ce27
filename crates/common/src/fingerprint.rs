// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dedup fingerprinting: a hash of `(event_kind, subject,
//! normalized_title, principal)`.

use sha2::{Digest, Sha256};

use crate::event::EventKind;

/// Opaque fingerprint used as the deduplicator's map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Compute the fingerprint of a candidate observation before it has
    /// been assigned a client id or timestamp.
    pub fn compute(kind: EventKind, subject: &str, title: Option<&str>, principal: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(subject.as_bytes());
        hasher.update(b"\0");
        if let Some(title) = title {
            hasher.update(normalize_title(title).as_bytes());
        }
        hasher.update(b"\0");
        if let Some(principal) = principal {
            hasher.update(principal.as_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self(bytes)
    }
}

/// Collapse whitespace and case so that cosmetic title differences (extra
/// spaces, a changed unsaved-document asterisk) don't defeat dedup.
fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase()
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
