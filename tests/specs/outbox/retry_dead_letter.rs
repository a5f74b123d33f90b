//! Outbox retry, dead-letter, and replay specs.

use crate::prelude::*;
use mu_adapters::DeliveryResult;
use mu_core::{OutboundEnvelope, OutboundKind, OutboxId, OutboxState, SequentialIdGen, ENVELOPE_VERSION};
use mu_engine::{Backoff, Dispatcher};
use mu_storage::{EnqueueOutcome, OutboxStore};
use std::sync::Arc;
use tempfile::TempDir;

fn outbound(body: &str) -> OutboundEnvelope {
    let inbound = EnvelopeBuilder::new("/mu status").build();
    OutboundEnvelope {
        v: ENVELOPE_VERSION,
        ts_ms: 1_000,
        channel: Channel::Telegram,
        channel_tenant_id: inbound.channel_tenant_id.clone(),
        channel_conversation_id: inbound.channel_conversation_id.clone(),
        request_id: inbound.request_id.clone(),
        response_id: "resp-1".to_string(),
        kind: OutboundKind::Result,
        body: body.to_string(),
        attachments: vec![],
        correlation: inbound.correlation(Some(CommandId::new("cmd-00000001"))),
        metadata: Default::default(),
    }
}

#[tokio::test]
async fn retries_then_dead_letters_then_dedupes_against_the_dead_record() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let store =
        OutboxStore::open(&dir.path().join("outbox.jsonl"), SequentialIdGen::new("out")).unwrap();
    let (mut dispatcher, handle, _wake_rx) =
        Dispatcher::new(store, Backoff::new(100, 1_000), clock.clone(), 4);
    let driver = FakeDriver::new();
    dispatcher.register_driver(Channel::Telegram, Arc::new(driver.clone()));

    for _ in 0..4 {
        driver.push_verdict(DeliveryResult::Retry {
            error: "telegram api status 502".to_string(),
            retry_delay_ms: None,
        });
    }

    handle.enqueue_outbound("d1", outbound("hello")).unwrap();

    // Three failures leave it pending with growing attempts
    for _ in 0..3 {
        dispatcher.drain_once().await.unwrap();
        clock.advance(std::time::Duration::from_millis(2_000));
    }
    let record = handle.get(&OutboxId::new("out-1")).unwrap();
    assert_eq!(record.state, OutboxState::Pending);
    assert_eq!(record.attempt_count, 3);

    // The fourth exhausts max_attempts
    dispatcher.drain_once().await.unwrap();
    let record = handle.get(&OutboxId::new("out-1")).unwrap();
    assert_eq!(record.state, OutboxState::DeadLetter);
    assert_eq!(
        record.dead_letter_reason.as_deref(),
        Some("attempts_exhausted")
    );

    // Same dedupe key points at the dead record
    match handle.enqueue_outbound("d1", outbound("hello again")).unwrap() {
        EnqueueOutcome::Duplicate(r) => {
            assert_eq!(r.outbox_id, OutboxId::new("out-1"));
            assert_eq!(r.state, OutboxState::DeadLetter);
        }
        other => panic!("expected duplicate, got {other:?}"),
    }
}

#[tokio::test]
async fn dead_letter_replay_preserves_correlation() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let store =
        OutboxStore::open(&dir.path().join("outbox.jsonl"), SequentialIdGen::new("out")).unwrap();
    let (mut dispatcher, handle, _wake_rx) =
        Dispatcher::new(store, Backoff::default(), clock.clone(), 1);
    let driver = FakeDriver::new();
    dispatcher.register_driver(Channel::Telegram, Arc::new(driver.clone()));

    driver.push_verdict(DeliveryResult::Retry {
        error: "boom".to_string(),
        retry_delay_ms: None,
    });
    handle.enqueue_outbound("d1", outbound("hello")).unwrap();
    dispatcher.drain_once().await.unwrap();

    let (original, replay) = handle
        .replay_dead_letter(&OutboxId::new("out-1"), &CommandId::new("cmd-00000009"))
        .unwrap();

    assert_eq!(original.state, OutboxState::DeadLetter);
    assert_ne!(replay.outbox_id, original.outbox_id);
    assert_eq!(replay.replay_of_outbox_id, Some(original.outbox_id.clone()));
    assert_eq!(
        replay.replay_requested_by_command_id,
        Some(CommandId::new("cmd-00000009"))
    );
    assert_eq!(
        replay.envelope.correlation.command_id,
        original.envelope.correlation.command_id
    );

    // The replay delivers on the next drain
    dispatcher.drain_once().await.unwrap();
    assert_eq!(
        handle.get(&replay.outbox_id).unwrap().state,
        OutboxState::Delivered
    );
    // Delivered and dead-letter are both terminal
    assert_eq!(
        handle.get(&original.outbox_id).unwrap().state,
        OutboxState::DeadLetter
    );
}

#[tokio::test]
async fn delivered_records_stay_delivered_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("outbox.jsonl");
    let clock = FakeClock::new();

    {
        let store = OutboxStore::open(&path, SequentialIdGen::new("out")).unwrap();
        let (mut dispatcher, handle, _wake_rx) =
            Dispatcher::new(store, Backoff::default(), clock.clone(), 4);
        let driver = FakeDriver::new();
        dispatcher.register_driver(Channel::Telegram, Arc::new(driver));
        handle.enqueue_outbound("d1", outbound("hello")).unwrap();
        dispatcher.drain_once().await.unwrap();
    }

    let store = OutboxStore::open(&path, SequentialIdGen::new("out2")).unwrap();
    let record = store.get(&OutboxId::new("out-1")).unwrap();
    assert_eq!(record.state, OutboxState::Delivered);
}
