// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort URL/domain extraction from a browser's window title.
//!
//! Browsers rarely put the full URL in the title bar; most append " - "
//! followed by the browser's own brand name. This module recognizes a
//! handful of known browser process names, strips that trailing suffix, and
//! falls back to a direct URL match when the title does contain one (some
//! in-house or kiosk browser configurations do this).

use regex::Regex;
use std::sync::OnceLock;

const KNOWN_BROWSERS: &[(&str, &str)] = &[
    ("chrome.exe", " - Google Chrome"),
    ("msedge.exe", " - Microsoft Edge"),
    ("firefox.exe", " - Mozilla Firefox"),
    ("brave.exe", " - Brave"),
    ("safari", " - Safari"),
];

pub fn is_known_browser(process_name: &str) -> bool {
    KNOWN_BROWSERS.iter().any(|(name, _)| name.eq_ignore_ascii_case(process_name))
}

fn direct_url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("static pattern is valid"))
}

/// Extract a best-effort URL or bare domain from a browser's title.
/// Returns `None` when the title carries no discernible site information
/// (e.g. a new-tab page or an about: page).
pub fn extract_subject(process_name: &str, title: &str) -> Option<String> {
    if let Some(found) = direct_url_pattern().find(title) {
        return Some(found.as_str().to_owned());
    }

    let trimmed = KNOWN_BROWSERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(process_name))
        .map(|(_, suffix)| strip_suffix_case_insensitive(title, suffix))
        .unwrap_or(title)
        .trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("new tab") {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn strip_suffix_case_insensitive<'a>(title: &'a str, suffix: &str) -> &'a str {
    if title.len() >= suffix.len() && title[title.len() - suffix.len()..].eq_ignore_ascii_case(suffix) {
        &title[..title.len() - suffix.len()]
    } else {
        title
    }
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
