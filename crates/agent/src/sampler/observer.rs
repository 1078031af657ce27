// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform observation seam. Real window/process/socket enumeration is
//! OS-specific (Win32 `GetForegroundWindow`, `/proc`, a netstat-equivalent);
//! this crate ships a deterministic [`SimulatedObserver`] behind the
//! [`PlatformObserver`] trait so the sampler's scheduling, dedup, and
//! emission logic is exercised and testable without platform code. A real
//! backend implements the same trait and is swapped in at `run.rs` wiring.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// The foreground top-level window at the moment of observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundWindow {
    pub process_name: String,
    pub title: String,
}

/// A running process matched against the configured allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// An established outbound connection to a non-loopback remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub remote_addr: String,
    pub remote_port: u16,
}

/// Narrow seam between the sampler's scheduling logic and OS-specific
/// enumeration.
pub trait PlatformObserver: Send + Sync {
    /// `None` when no session is active (locked workstation, no desktop).
    fn foreground_window(&self) -> Option<ForegroundWindow>;
    fn running_processes(&self) -> Vec<ProcessInfo>;
    fn established_connections(&self) -> Vec<ConnectionInfo>;
}

/// A scripted observation for one sampling tick.
#[derive(Debug, Clone, Default)]
pub struct ObservedTick {
    pub focus: Option<ForegroundWindow>,
    pub processes: Vec<ProcessInfo>,
    pub connections: Vec<ConnectionInfo>,
}

/// Deterministic observer driven by a pre-scripted sequence of ticks,
/// repeating the last tick once the script is exhausted. Used both as the
/// shipped default (a single static tick, since no real backend exists in
/// this environment) and in tests to drive specific scenarios.
pub struct SimulatedObserver {
    script: Mutex<VecDeque<ObservedTick>>,
    last: Mutex<ObservedTick>,
}

impl SimulatedObserver {
    pub fn new(script: Vec<ObservedTick>) -> Self {
        let last = script.last().cloned().unwrap_or_default();
        Self { script: Mutex::new(script.into()), last: Mutex::new(last) }
    }

    /// A single stationary tick with no focus window, no matched processes,
    /// and no connections — the inert default when no script is supplied.
    pub fn idle() -> Self {
        Self::new(vec![ObservedTick::default()])
    }

    fn next_tick(&self) -> ObservedTick {
        let mut script = self.script.lock();
        if let Some(tick) = script.pop_front() {
            *self.last.lock() = tick.clone();
            tick
        } else {
            self.last.lock().clone()
        }
    }
}

impl PlatformObserver for SimulatedObserver {
    fn foreground_window(&self) -> Option<ForegroundWindow> {
        self.next_tick().focus
    }

    fn running_processes(&self) -> Vec<ProcessInfo> {
        self.last.lock().processes.clone()
    }

    fn established_connections(&self) -> Vec<ConnectionInfo> {
        self.last.lock().connections.clone()
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
