//! Duplicate delivery and fingerprint conflict specs.

use crate::prelude::*;

#[tokio::test]
async fn duplicate_delivery_is_noop_after_completion() {
    let fx = pipeline_fixture();
    let env = EnvelopeBuilder::new("/mu status")
        .idempotency("k1", "f1")
        .build();

    // First delivery completes
    let first = fx.pipeline.handle(&env).await.unwrap();
    let original = match &first {
        CommandPipelineResult::Completed { record } => record.command_id.clone(),
        other => panic!("expected completed, got {other:?}"),
    };

    // The identical envelope is a physical retry
    match fx.pipeline.handle(&env).await.unwrap() {
        CommandPipelineResult::Noop { reason, command_id } => {
            assert_eq!(reason, ErrorCode::DuplicateDelivery);
            assert_eq!(command_id, Some(original));
        }
        other => panic!("expected noop, got {other:?}"),
    }

    // Exactly one terminal side effect in the journal
    let completed: Vec<_> = lifecycle_entries(&fx.paths)
        .into_iter()
        .filter(|(_, state)| *state == CommandState::Completed)
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(fx.executor.executed().len(), 1);
}

#[tokio::test]
async fn fingerprint_conflict_is_denied() {
    let fx = pipeline_fixture();
    let first = EnvelopeBuilder::new("/mu status")
        .idempotency("k1", "f1")
        .build();
    let second = EnvelopeBuilder::new("/mu status")
        .idempotency("k1", "f2")
        .build();

    assert!(matches!(
        fx.pipeline.handle(&first).await.unwrap(),
        CommandPipelineResult::Completed { .. }
    ));
    assert_eq!(
        fx.pipeline.handle(&second).await.unwrap(),
        CommandPipelineResult::Denied {
            reason: ErrorCode::IdempotencyConflict
        }
    );
}

#[tokio::test]
async fn exactly_one_of_two_identical_inbounds_takes_effect() {
    // The invariant holds regardless of which path the command takes
    let fx = pipeline_fixture();
    let env = EnvelopeBuilder::new("mu! issue dep add mu-1 mu-2")
        .idempotency("k-dep", "f-dep")
        .build();

    let results = (
        fx.pipeline.handle(&env).await.unwrap(),
        fx.pipeline.handle(&env).await.unwrap(),
    );

    let noops = [&results.0, &results.1]
        .iter()
        .filter(|r| matches!(r, CommandPipelineResult::Noop { .. }))
        .count();
    assert_eq!(noops, 1);
    assert_eq!(fx.executor.executed().len(), 1);
}
