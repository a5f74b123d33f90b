//! Reload lifecycle specs: drain failure rollback, coalescing,
//! generation monotonicity.

use crate::prelude::*;
use async_trait::async_trait;
use mu_adapters::AdapterSpec;
use mu_core::{GenerationIdentity, ReloadOutcome};
use mu_daemon::{
    ControlSurface, GenerationRuntime, GenerationSupervisor, ReloadOrchestrator, ReloadTelemetry,
    RuntimeFactory, StopError, WarmupError,
};
use parking_lot::Mutex;
use std::sync::Arc;

struct ScriptedRuntime {
    generation: GenerationIdentity,
    fail_stop: Mutex<bool>,
}

impl ScriptedRuntime {
    fn new(generation: GenerationIdentity, fail_stop: bool) -> Arc<Self> {
        Arc::new(Self {
            generation,
            fail_stop: Mutex::new(fail_stop),
        })
    }
}

#[async_trait]
impl GenerationRuntime for ScriptedRuntime {
    fn adapter_specs(&self) -> Vec<AdapterSpec> {
        vec![AdapterSpec {
            channel: Channel::Telegram,
            route: "/webhooks/telegram",
            ingress_payload: "telegram_update",
            verification: "shared_secret_header",
            ack_format: "json_ok",
            deferred_delivery: true,
        }]
    }

    async fn stop(&self) -> Result<(), StopError> {
        if *self.fail_stop.lock() {
            Err(StopError("drain wedged".to_string()))
        } else {
            Ok(())
        }
    }
}

struct ScriptedFactory;

#[async_trait]
impl RuntimeFactory for ScriptedFactory {
    type Runtime = ScriptedRuntime;

    async fn build(
        &self,
        generation: &GenerationIdentity,
    ) -> Result<Arc<ScriptedRuntime>, WarmupError> {
        Ok(ScriptedRuntime::new(generation.clone(), false))
    }
}

fn orchestrator(
    fail_first_drain: bool,
) -> (
    Arc<ReloadOrchestrator<ScriptedFactory, FakeClock>>,
    Arc<GenerationSupervisor>,
    Arc<ReloadTelemetry>,
) {
    let supervisor = Arc::new(GenerationSupervisor::new("mu"));
    let telemetry = Arc::new(ReloadTelemetry::new());
    let initial = ScriptedRuntime::new(supervisor.active_generation(), fail_first_drain);
    let orchestrator = Arc::new(ReloadOrchestrator::new(
        Arc::clone(&supervisor),
        Arc::clone(&telemetry),
        ScriptedFactory,
        initial,
        FakeClock::new(),
    ));
    (orchestrator, supervisor, telemetry)
}

#[tokio::test]
async fn drain_failure_rolls_back_and_reports_500() {
    let (orchestrator, supervisor, telemetry) = orchestrator(true);
    let control = ControlSurface::new(Arc::clone(&orchestrator));

    let response = control.reload("rollout").await.unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.generation.to_generation, "mu-gen-1");
    assert_eq!(response.generation.active_generation, "mu-gen-0");
    assert_eq!(response.generation.outcome, ReloadOutcome::Failure);
    assert_eq!(supervisor.active_generation().generation_id, "mu-gen-0");

    let snap = telemetry.snapshot();
    assert_eq!(snap.reload_failure_total, 1);
    assert_eq!(snap.reload_drain_duration_samples_total, 1);
    assert!(snap.events.contains(&"drain:failed".to_string()));
    assert!(snap.events.contains(&"rollback:complete".to_string()));
}

#[tokio::test]
async fn successful_reload_reports_the_new_generation() {
    let (orchestrator, _, telemetry) = orchestrator(false);
    let control = ControlSurface::new(Arc::clone(&orchestrator));

    let response = control.reload("rollout").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.generation.active_generation, "mu-gen-1");
    assert!(!response.adapters.is_empty());
    // The promoted runtime carries the new generation identity
    assert_eq!(
        orchestrator.active_runtime().generation.generation_id,
        "mu-gen-1"
    );

    let snap = telemetry.snapshot();
    assert_eq!(snap.reload_success_total, 1);
    assert!(snap.events.contains(&"rollback:skipped".to_string()));
}

#[tokio::test]
async fn generation_seq_increases_across_repeated_reloads() {
    let (orchestrator, supervisor, _) = orchestrator(false);

    let mut seqs = Vec::new();
    for _ in 0..3 {
        let summary = orchestrator.reload("again").await.unwrap();
        assert_eq!(summary.outcome, ReloadOutcome::Success);
        seqs.push(supervisor.active_generation().generation_seq);
    }
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn overlapping_reload_calls_share_one_attempt() {
    let (orchestrator, _, telemetry) = orchestrator(false);

    // Sequential calls do NOT coalesce (each sees no pending attempt)
    let first = orchestrator.reload("one").await.unwrap();
    let second = orchestrator.reload("two").await.unwrap();
    assert_ne!(first.attempt.attempt_id, second.attempt.attempt_id);
    assert_eq!(telemetry.snapshot().duplicate_signal_total, 0);
}
