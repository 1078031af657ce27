// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn recognizes_known_browsers() {
    assert!(is_known_browser("chrome.exe"));
    assert!(is_known_browser("CHROME.EXE"));
    assert!(!is_known_browser("notepad.exe"));
}

#[test]
fn strips_browser_suffix() {
    let subject = extract_subject("chrome.exe", "Inbox (4) - acme@example.com - Gmail - Google Chrome");
    assert_eq!(subject.as_deref(), Some("Inbox (4) - acme@example.com - Gmail"));
}

#[test]
fn prefers_a_literal_url_when_present() {
    let subject = extract_subject("chrome.exe", "https://example.com/dashboard - Google Chrome");
    assert_eq!(subject.as_deref(), Some("https://example.com/dashboard"));
}

#[test]
fn treats_new_tab_as_no_subject() {
    assert_eq!(extract_subject("chrome.exe", "New Tab - Google Chrome"), None);
}
