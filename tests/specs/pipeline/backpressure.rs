//! Backpressure specs.

use crate::prelude::*;
use mu_engine::{OverflowBehavior, RateLimitConfig};

fn zero_actor_limit(overflow: OverflowBehavior) -> PolicyConfig {
    PolicyConfig {
        rate: RateLimitConfig {
            actor_limit: 0,
            channel_limit: 100,
            window_ms: 60_000,
            overflow,
            defer_ms: 250,
        },
        ..PolicyConfig::default()
    }
}

#[tokio::test]
async fn confirmed_mutation_defers_with_the_configured_delay() {
    let fx = pipeline_fixture_with(
        zero_actor_limit(OverflowBehavior::Defer),
        PipelineConfig::default(),
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

    let now = fx.clock.epoch_ms();
    let confirm = EnvelopeBuilder::new(format!("confirm {command_id}"))
        .idempotency("k-confirm", "f-confirm")
        .build();
    match fx.pipeline.handle(&confirm).await.unwrap() {
        CommandPipelineResult::Deferred { record } => {
            assert_eq!(record.retry_at_ms, Some(now + 250));
            assert_eq!(record.state, CommandState::Deferred);
        }
        other => panic!("expected deferred, got {other:?}"),
    }
    assert!(fx.executor.executed().is_empty());
}

#[tokio::test]
async fn overflow_fail_is_terminal() {
    let fx = pipeline_fixture_with(
        zero_actor_limit(OverflowBehavior::Fail),
        PipelineConfig::default(),
        Some(wildcard_binding()),
    );

    let env = EnvelopeBuilder::new("mu! issue dep add mu-1 mu-2").build();
    match fx.pipeline.handle(&env).await.unwrap() {
        CommandPipelineResult::Failed { record } => {
            assert_eq!(record.error_code.as_deref(), Some("backpressure_overflow"));
        }
        other => panic!("expected failed, got {other:?}"),
    }
}

#[tokio::test]
async fn deferred_mutation_completes_after_the_window() {
    let fx = pipeline_fixture_with(
        PolicyConfig {
            rate: RateLimitConfig {
                actor_limit: 1,
                channel_limit: 100,
                window_ms: 1_000,
                overflow: OverflowBehavior::Defer,
                defer_ms: 1_500,
            },
            ..PolicyConfig::default()
        },
        PipelineConfig::default(),
        Some(wildcard_binding()),
    );

    // First mutation takes the only slot
    let first = EnvelopeBuilder::new("mu! issue dep add mu-1 mu-2").build();
    assert!(matches!(
        fx.pipeline.handle(&first).await.unwrap(),
        CommandPipelineResult::Completed { .. }
    ));

    // Second defers
    let second = EnvelopeBuilder::new("mu! issue dep add mu-3 mu-4").build();
    assert!(matches!(
        fx.pipeline.handle(&second).await.unwrap(),
        CommandPipelineResult::Deferred { .. }
    ));

    // After the retry time (and a slid window) it completes
    fx.clock.advance(std::time::Duration::from_millis(1_500));
    let results = fx.pipeline.requeue_deferred().await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        CommandPipelineResult::Completed { .. }
    ));
}
