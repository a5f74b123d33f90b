// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reload telemetry: phase events and counters.
//!
//! Events are emitted through `tracing` and retained in-process so the
//! control surface (and tests) can read them back.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Default)]
struct TelemetryState {
    reload_success_total: u64,
    reload_failure_total: u64,
    duplicate_signal_total: u64,
    reload_drain_duration_ms_total: u64,
    reload_drain_duration_samples_total: u64,
    events: Vec<String>,
}

/// Counters and the retained event trail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub reload_success_total: u64,
    pub reload_failure_total: u64,
    pub duplicate_signal_total: u64,
    pub reload_drain_duration_ms_total: u64,
    pub reload_drain_duration_samples_total: u64,
    pub events: Vec<String>,
}

/// Shared reload telemetry.
#[derive(Default)]
pub struct ReloadTelemetry {
    inner: Mutex<TelemetryState>,
}

impl ReloadTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one phase event, e.g. `warmup:failed`.
    pub fn event(&self, phase: &str, outcome: &str) {
        info!(target: "reload", phase, outcome, "reload phase");
        self.inner.lock().events.push(format!("{phase}:{outcome}"));
    }

    pub fn reload_success(&self) {
        self.inner.lock().reload_success_total += 1;
    }

    pub fn reload_failure(&self) {
        self.inner.lock().reload_failure_total += 1;
    }

    pub fn duplicate_signal(&self) {
        self.inner.lock().duplicate_signal_total += 1;
    }

    /// Sample one drain duration (success or failure).
    pub fn sample_drain(&self, elapsed_ms: u64) {
        let mut state = self.inner.lock();
        state.reload_drain_duration_ms_total += elapsed_ms;
        state.reload_drain_duration_samples_total += 1;
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let state = self.inner.lock();
        TelemetrySnapshot {
            reload_success_total: state.reload_success_total,
            reload_failure_total: state.reload_failure_total,
            duplicate_signal_total: state.duplicate_signal_total,
            reload_drain_duration_ms_total: state.reload_drain_duration_ms_total,
            reload_drain_duration_samples_total: state.reload_drain_duration_samples_total,
            events: state.events.clone(),
        }
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
