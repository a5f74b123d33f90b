// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::EnvelopeBuilder;
use yare::parameterized;

#[test]
fn valid_envelope_passes() {
    let env = EnvelopeBuilder::new("/status").build();
    assert!(env.validate().is_ok());
}

#[test]
fn wrong_version_is_schema_invalid() {
    let mut env = EnvelopeBuilder::new("/status").build();
    env.v = 99;
    assert_eq!(env.validate(), Err(ErrorCode::SchemaInvalid));
}

#[parameterized(
    request_id = { "request_id" },
    delivery_id = { "delivery_id" },
    idempotency_key = { "idempotency_key" },
    fingerprint = { "fingerprint" },
    tenant = { "channel_tenant_id" },
    actor = { "actor_id" },
)]
fn blank_required_field_is_schema_invalid(field: &str) {
    let mut env = EnvelopeBuilder::new("/status").build();
    match field {
        "request_id" => env.request_id.clear(),
        "delivery_id" => env.delivery_id.clear(),
        "idempotency_key" => env.idempotency_key.clear(),
        "fingerprint" => env.fingerprint.clear(),
        "channel_tenant_id" => env.channel_tenant_id.clear(),
        "actor_id" => env.actor_id.clear(),
        other => panic!("unknown field {other}"),
    }
    assert_eq!(env.validate(), Err(ErrorCode::SchemaInvalid));
}

#[test]
fn telegram_is_conversational_by_default() {
    let env = EnvelopeBuilder::new("hello").build();
    assert!(env.conversational_ingress());
}

#[test]
fn editor_needs_the_metadata_override() {
    let env = EnvelopeBuilder::new("hello")
        .channel(Channel::Editor)
        .build();
    assert!(!env.conversational_ingress());

    let env = EnvelopeBuilder::new("hello")
        .channel(Channel::Editor)
        .metadata(INGRESS_OVERRIDE_KEY, INGRESS_OVERRIDE_VALUE)
        .build();
    assert!(env.conversational_ingress());
}

#[test]
fn inbound_roundtrips_through_serde() {
    let env = EnvelopeBuilder::new("/issue close mu-1")
        .metadata("source", "spec")
        .build();
    let json = serde_json::to_string(&env).unwrap();
    let back: InboundEnvelope = serde_json::from_str(&json).unwrap();
    assert_eq!(env, back);
}

#[test]
fn outbound_roundtrips_through_serde() {
    let inbound = EnvelopeBuilder::new("/status").build();
    let out = OutboundEnvelope {
        v: ENVELOPE_VERSION,
        ts_ms: 2_000,
        channel: inbound.channel,
        channel_tenant_id: inbound.channel_tenant_id.clone(),
        channel_conversation_id: inbound.channel_conversation_id.clone(),
        request_id: inbound.request_id.clone(),
        response_id: "resp-1".to_string(),
        kind: OutboundKind::Result,
        body: "ok".to_string(),
        attachments: vec![],
        correlation: inbound.correlation(Some(crate::CommandId::new("cmd-1"))),
        metadata: Default::default(),
    };
    let json = serde_json::to_string(&out).unwrap();
    let back: OutboundEnvelope = serde_json::from_str(&json).unwrap();
    assert_eq!(out, back);
}

#[test]
fn correlation_carries_the_command_id() {
    let env = EnvelopeBuilder::new("/status").build();
    let corr = env.correlation(Some(crate::CommandId::new("cmd-7")));
    assert_eq!(corr.request_id, "req-1");
    assert_eq!(corr.command_id, Some(crate::CommandId::new("cmd-7")));
}
