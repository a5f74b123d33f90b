// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn starts_at_generation_zero() {
    let supervisor = GenerationSupervisor::new("mu");
    let active = supervisor.active_generation();
    assert_eq!(active.generation_id, "mu-gen-0");
    assert_eq!(active.generation_seq, 0);
    assert!(supervisor.pending().is_none());
}

#[test]
fn begin_reload_plans_the_next_generation() {
    let supervisor = GenerationSupervisor::new("mu");
    let begin = supervisor.begin_reload("config change", 1_000);

    assert!(!begin.coalesced);
    assert_eq!(begin.attempt.state, ReloadAttemptState::Planned);
    assert_eq!(begin.attempt.from_generation.generation_id, "mu-gen-0");
    assert_eq!(begin.attempt.to_generation.generation_id, "mu-gen-1");
    assert_eq!(begin.attempt.reason, "config change");
    // Active generation unchanged until the swap installs
    assert_eq!(supervisor.active_generation().generation_id, "mu-gen-0");
}

#[test]
fn overlapping_begin_calls_coalesce() {
    let supervisor = GenerationSupervisor::new("mu");
    let first = supervisor.begin_reload("one", 1_000);
    let second = supervisor.begin_reload("two", 1_100);

    assert!(second.coalesced);
    assert_eq!(second.attempt.attempt_id, first.attempt.attempt_id);
    // The original reason wins
    assert_eq!(second.attempt.reason, "one");
}

#[test]
fn swap_promotes_the_target_generation() {
    let supervisor = GenerationSupervisor::new("mu");
    let begin = supervisor.begin_reload("x", 1_000);

    supervisor
        .mark_swap_installed(&begin.attempt.attempt_id, 1_100)
        .unwrap();
    assert_eq!(supervisor.active_generation().generation_id, "mu-gen-1");

    let pending = supervisor.pending().unwrap();
    assert_eq!(pending.state, ReloadAttemptState::Swapped);
    assert_eq!(pending.swapped_at_ms, Some(1_100));
}

#[test]
fn rollback_restores_the_source_generation() {
    let supervisor = GenerationSupervisor::new("mu");
    let begin = supervisor.begin_reload("x", 1_000);
    supervisor
        .mark_swap_installed(&begin.attempt.attempt_id, 1_100)
        .unwrap();

    supervisor
        .rollback_swap_installed(&begin.attempt.attempt_id)
        .unwrap();
    assert_eq!(supervisor.active_generation().generation_id, "mu-gen-0");
}

#[test]
fn rollback_requires_a_swapped_attempt() {
    let supervisor = GenerationSupervisor::new("mu");
    let begin = supervisor.begin_reload("x", 1_000);
    assert_eq!(
        supervisor.rollback_swap_installed(&begin.attempt.attempt_id),
        Err(SupervisorError::WrongState(begin.attempt.attempt_id))
    );
}

#[test]
fn finish_clears_pending_and_records_last() {
    let supervisor = GenerationSupervisor::new("mu");
    let begin = supervisor.begin_reload("x", 1_000);
    supervisor
        .mark_swap_installed(&begin.attempt.attempt_id, 1_100)
        .unwrap();

    let finished = supervisor
        .finish_reload(&begin.attempt.attempt_id, ReloadOutcome::Success, 1_200)
        .unwrap();
    assert_eq!(finished.state, ReloadAttemptState::Completed);
    assert_eq!(finished.finished_at_ms, Some(1_200));
    assert!(supervisor.pending().is_none());

    let snap = supervisor.snapshot();
    assert_eq!(snap.last_reload, Some(finished));
    assert_eq!(snap.active_generation.generation_id, "mu-gen-1");
}

#[test]
fn generation_seq_strictly_increases_across_successes() {
    let supervisor = GenerationSupervisor::new("mu");
    let mut seen = Vec::new();
    for n in 0..3 {
        let begin = supervisor.begin_reload("again", 1_000 + n);
        supervisor
            .mark_swap_installed(&begin.attempt.attempt_id, 1_100 + n)
            .unwrap();
        supervisor
            .finish_reload(&begin.attempt.attempt_id, ReloadOutcome::Success, 1_200 + n)
            .unwrap();
        seen.push(supervisor.active_generation().generation_seq);
    }
    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn failed_attempt_does_not_reuse_its_generation() {
    let supervisor = GenerationSupervisor::new("mu");
    let begin = supervisor.begin_reload("x", 1_000);
    supervisor
        .finish_reload(&begin.attempt.attempt_id, ReloadOutcome::Failure, 1_100)
        .unwrap();
    assert_eq!(supervisor.active_generation().generation_id, "mu-gen-0");

    // Next attempt targets a fresh sequence number
    let next = supervisor.begin_reload("y", 2_000);
    assert_eq!(next.attempt.to_generation.generation_id, "mu-gen-2");
}

#[test]
fn finish_with_unknown_attempt_errors() {
    let supervisor = GenerationSupervisor::new("mu");
    supervisor.begin_reload("x", 1_000);
    assert!(matches!(
        supervisor.finish_reload(
            &ReloadAttemptId::new("mu-reload-404"),
            ReloadOutcome::Success,
            1_100,
        ),
        Err(SupervisorError::UnknownAttempt(_))
    ));
}

#[test]
fn operations_without_pending_error() {
    let supervisor = GenerationSupervisor::new("mu");
    assert_eq!(
        supervisor.mark_swap_installed(&ReloadAttemptId::new("a"), 1_000),
        Err(SupervisorError::NoPending)
    );
}
