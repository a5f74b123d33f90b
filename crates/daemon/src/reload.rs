// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reload orchestrator: warmup, cutover, drain, rollback.
//!
//! A generation is a value: warmup builds a fresh runtime instance,
//! cutover is a single-pointer swap, and rollback reverts the pointer.
//! Rollback only triggers on drain failure after cutover.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use thiserror::Error;

use crate::supervisor::GenerationSupervisor;
use crate::telemetry::ReloadTelemetry;
use mu_adapters::AdapterSpec;
use mu_core::{Clock, GenerationIdentity, ReloadAttempt, ReloadOutcome};

/// Warmup failure: the new runtime could not be constructed.
#[derive(Debug, Error)]
#[error("warmup failed: {0}")]
pub struct WarmupError(pub String);

/// Drain failure: the old runtime did not stop cleanly.
#[derive(Debug, Error)]
#[error("stop failed: {0}")]
pub struct StopError(pub String);

/// Errors surfaced by the orchestrator itself.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("no pending reload to roll back")]
    NothingToRollBack,
    #[error(transparent)]
    Supervisor(#[from] crate::supervisor::SupervisorError),
}

/// One live control-plane generation.
#[async_trait]
pub trait GenerationRuntime: Send + Sync + 'static {
    /// Specs of the adapters this generation serves.
    fn adapter_specs(&self) -> Vec<AdapterSpec>;

    /// Stop accepting traffic and drain in-flight work.
    async fn stop(&self) -> Result<(), StopError>;
}

/// Builds runtime instances during warmup.
#[async_trait]
pub trait RuntimeFactory: Send + Sync + 'static {
    type Runtime: GenerationRuntime;

    async fn build(
        &self,
        generation: &GenerationIdentity,
    ) -> Result<Arc<Self::Runtime>, WarmupError>;
}

/// Outcome returned to the control surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadSummary {
    pub attempt: ReloadAttempt,
    pub outcome: ReloadOutcome,
    pub active_generation: GenerationIdentity,
    pub coalesced: bool,
}

/// The reload orchestrator. Holds the active-runtime pointer.
pub struct ReloadOrchestrator<F: RuntimeFactory, C: Clock> {
    supervisor: Arc<GenerationSupervisor>,
    telemetry: Arc<ReloadTelemetry>,
    factory: F,
    clock: C,
    active: RwLock<Arc<F::Runtime>>,
    /// Old runtime retained while an attempt is pending, for rollback.
    previous: Mutex<Option<Arc<F::Runtime>>>,
    /// Serializes reload execution; coalesced callers wait here for the
    /// in-flight attempt.
    run_lock: tokio::sync::Mutex<()>,
}

impl<F: RuntimeFactory, C: Clock> ReloadOrchestrator<F, C> {
    pub fn new(
        supervisor: Arc<GenerationSupervisor>,
        telemetry: Arc<ReloadTelemetry>,
        factory: F,
        initial: Arc<F::Runtime>,
        clock: C,
    ) -> Self {
        Self {
            supervisor,
            telemetry,
            factory,
            clock,
            active: RwLock::new(initial),
            previous: Mutex::new(None),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The active runtime handle.
    pub fn active_runtime(&self) -> Arc<F::Runtime> {
        Arc::clone(&self.active.read())
    }

    pub fn supervisor(&self) -> &GenerationSupervisor {
        &self.supervisor
    }

    pub fn telemetry(&self) -> &ReloadTelemetry {
        &self.telemetry
    }

    /// Run one reload. Coalesces onto an in-flight attempt if present.
    pub async fn reload(&self, reason: &str) -> Result<ReloadSummary, ReloadError> {
        let begin = self.supervisor.begin_reload(reason, self.clock.epoch_ms());

        if begin.coalesced {
            self.telemetry.duplicate_signal();
            // Wait for the in-flight attempt to finish, then report it
            let _wait = self.run_lock.lock().await;
            let snapshot = self.supervisor.snapshot();
            let finished = snapshot
                .last_reload
                .filter(|a| a.attempt_id == begin.attempt.attempt_id)
                .unwrap_or(begin.attempt);
            let outcome = match finished.state {
                mu_core::ReloadAttemptState::Completed => ReloadOutcome::Success,
                _ => ReloadOutcome::Failure,
            };
            return Ok(ReloadSummary {
                attempt: finished,
                outcome,
                active_generation: self.supervisor.active_generation(),
                coalesced: true,
            });
        }

        let _running = self.run_lock.lock().await;
        let attempt = begin.attempt;
        let attempt_id = attempt.attempt_id.clone();

        // Warmup: construct the new runtime without accepting traffic
        self.telemetry.event("warmup", "start");
        let new_runtime = match self.factory.build(&attempt.to_generation).await {
            Ok(runtime) => runtime,
            Err(e) => {
                self.telemetry.event("warmup", "failed");
                self.telemetry.reload_failure();
                tracing::warn!(error = %e, "reload warmup failed");
                let finished = self.supervisor.finish_reload(
                    &attempt_id,
                    ReloadOutcome::Failure,
                    self.clock.epoch_ms(),
                )?;
                return Ok(ReloadSummary {
                    attempt: finished,
                    outcome: ReloadOutcome::Failure,
                    active_generation: self.supervisor.active_generation(),
                    coalesced: false,
                });
            }
        };
        self.telemetry.event("warmup", "complete");

        // Cutover: single-pointer swap
        self.telemetry.event("cutover", "start");
        let old_runtime = {
            let mut active = self.active.write();
            std::mem::replace(&mut *active, Arc::clone(&new_runtime))
        };
        *self.previous.lock() = Some(Arc::clone(&old_runtime));
        self.supervisor
            .mark_swap_installed(&attempt_id, self.clock.epoch_ms())?;
        self.telemetry.event("cutover", "complete");

        // Drain the prior generation
        self.telemetry.event("drain", "start");
        let drain_start = self.clock.now();
        let drain_result = old_runtime.stop().await;
        let elapsed_ms = self.clock.now().duration_since(drain_start).as_millis() as u64;
        self.telemetry.sample_drain(elapsed_ms);

        match drain_result {
            Ok(()) => {
                self.telemetry.event("drain", "complete");
                self.telemetry.event("rollback", "skipped");
                *self.previous.lock() = None;
                let finished = self.supervisor.finish_reload(
                    &attempt_id,
                    ReloadOutcome::Success,
                    self.clock.epoch_ms(),
                )?;
                self.telemetry.reload_success();
                Ok(ReloadSummary {
                    attempt: finished,
                    outcome: ReloadOutcome::Success,
                    active_generation: self.supervisor.active_generation(),
                    coalesced: false,
                })
            }
            Err(e) => {
                self.telemetry.event("drain", "failed");
                tracing::warn!(error = %e, "drain failed after cutover, rolling back");

                self.telemetry.event("rollback", "start");
                {
                    let mut active = self.active.write();
                    *active = Arc::clone(&old_runtime);
                }
                *self.previous.lock() = None;
                self.supervisor.rollback_swap_installed(&attempt_id)?;
                // Best-effort stop of the never-promoted runtime
                let _ = new_runtime.stop().await;
                self.telemetry.event("rollback", "complete");

                let finished = self.supervisor.finish_reload(
                    &attempt_id,
                    ReloadOutcome::Failure,
                    self.clock.epoch_ms(),
                )?;
                self.telemetry.reload_failure();
                Ok(ReloadSummary {
                    attempt: finished,
                    outcome: ReloadOutcome::Failure,
                    active_generation: self.supervisor.active_generation(),
                    coalesced: false,
                })
            }
        }
    }

    /// Force a rollback of the pending reload (crash recovery surface).
    ///
    /// Waits out any in-flight reload first; a completed attempt leaves
    /// nothing to roll back.
    pub async fn force_rollback(&self) -> Result<ReloadSummary, ReloadError> {
        let _running = self.run_lock.lock().await;
        let Some(pending) = self.supervisor.pending() else {
            return Err(ReloadError::NothingToRollBack);
        };

        self.telemetry.event("rollback", "start");
        if let Some(previous) = self.previous.lock().take() {
            let mut active = self.active.write();
            *active = previous;
        }
        if pending.state == mu_core::ReloadAttemptState::Swapped {
            self.supervisor
                .rollback_swap_installed(&pending.attempt_id)?;
        }
        self.telemetry.event("rollback", "complete");

        let finished = self.supervisor.finish_reload(
            &pending.attempt_id,
            ReloadOutcome::Failure,
            self.clock.epoch_ms(),
        )?;
        self.telemetry.reload_failure();
        Ok(ReloadSummary {
            attempt: finished,
            outcome: ReloadOutcome::Failure,
            active_generation: self.supervisor.active_generation(),
            coalesced: false,
        })
    }
}

#[cfg(test)]
#[path = "reload_tests.rs"]
mod tests;
