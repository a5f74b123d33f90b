//! Confirmation ledger specs.

use crate::prelude::*;

#[tokio::test]
async fn issue_close_requires_and_honors_confirmation() {
    let fx = pipeline_fixture_with(
        PolicyConfig::default(),
        PipelineConfig::default(),
        Some(scoped_binding(&["cp.issue.write"], AssuranceTier::TierA)),
    );

    // First call parks the mutation
    let env = EnvelopeBuilder::new("mu! issue close mu-1")
        .idempotency("k-close", "f-close")
        .build();
    let command_id = match fx.pipeline.handle(&env).await.unwrap() {
        CommandPipelineResult::AwaitingConfirmation { record } => {
            assert!(record.confirmation_expires_at_ms.is_some());
            record.command_id
        }
        other => panic!("expected awaiting confirmation, got {other:?}"),
    };
    assert!(fx.executor.executed().is_empty());

    // Confirm executes it
    let confirm = EnvelopeBuilder::new(format!("mu! confirm {command_id}"))
        .idempotency("k-confirm", "f-confirm")
        .build();
    match fx.pipeline.handle(&confirm).await.unwrap() {
        CommandPipelineResult::Completed { record } => {
            assert_eq!(record.command_id, command_id);
            assert_eq!(record.state, CommandState::Completed);
        }
        other => panic!("expected completed, got {other:?}"),
    }

    // A second confirm hits a terminal record
    let again = EnvelopeBuilder::new(format!("mu! confirm {command_id}"))
        .idempotency("k-confirm-2", "f-confirm-2")
        .build();
    assert!(matches!(
        fx.pipeline.handle(&again).await.unwrap(),
        CommandPipelineResult::Denied { .. }
    ));
}

#[tokio::test]
async fn cancel_prevents_execution() {
    let fx = pipeline_fixture();
    let env = EnvelopeBuilder::new("mu! issue close mu-1")
        .idempotency("k-close", "f-close")
        .build();
    let command_id = fx
        .pipeline
        .handle(&env)
        .await
        .unwrap()
        .record()
        .unwrap()
        .command_id
        .clone();

    let cancel = EnvelopeBuilder::new(format!("cancel {command_id}"))
        .idempotency("k-cancel", "f-cancel")
        .build();
    assert!(matches!(
        fx.pipeline.handle(&cancel).await.unwrap(),
        CommandPipelineResult::Cancelled { .. }
    ));
    assert!(fx.executor.executed().is_empty());
}

#[tokio::test]
async fn zero_ttl_confirmations_expire_immediately() {
    let fx = pipeline_fixture_with(
        PolicyConfig::default(),
        PipelineConfig {
            confirmation_ttl_ms: 0,
            ..PipelineConfig::default()
        },
        Some(wildcard_binding()),
    );

    let env = EnvelopeBuilder::new("mu! issue close mu-1").build();
    let command_id = fx
        .pipeline
        .handle(&env)
        .await
        .unwrap()
        .record()
        .unwrap()
        .command_id
        .clone();

    let confirm = EnvelopeBuilder::new(format!("confirm {command_id}"))
        .idempotency("k-confirm", "f-confirm")
        .build();
    assert!(matches!(
        fx.pipeline.handle(&confirm).await.unwrap(),
        CommandPipelineResult::Denied { .. }
    ));
    assert!(fx.executor.executed().is_empty());
}
