// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn identical_observations_share_a_fingerprint() {
    let a = Fingerprint::compute(EventKind::WindowFocus, "chrome.exe", Some("Inbox  -  Mail"), Some("ACME\\bob"));
    let b = Fingerprint::compute(EventKind::WindowFocus, "chrome.exe", Some("inbox - mail"), Some("ACME\\bob"));
    assert_eq!(a, b);
}

#[test]
fn different_subjects_differ() {
    let a = Fingerprint::compute(EventKind::WindowFocus, "chrome.exe", None, None);
    let b = Fingerprint::compute(EventKind::WindowFocus, "firefox.exe", None, None);
    assert_ne!(a, b);
}
