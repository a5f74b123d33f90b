//! Envelope serde round-trip specs.

use crate::prelude::*;
use mu_core::{InboundEnvelope, OutboundEnvelope, OutboundKind, ENVELOPE_VERSION};
use similar_asserts::assert_eq;

#[test]
fn inbound_envelope_roundtrips() {
    let envelope = EnvelopeBuilder::new("mu! issue close mu-1")
        .metadata("cli_invocation_id", "inv-7")
        .build();

    let json = serde_json::to_string(&envelope).unwrap();
    let back: InboundEnvelope = serde_json::from_str(&json).unwrap();
    assert_eq!(envelope, back);
}

#[test]
fn outbound_envelope_roundtrips() {
    let inbound = EnvelopeBuilder::new("/mu status").build();
    let envelope = OutboundEnvelope {
        v: ENVELOPE_VERSION,
        ts_ms: 2_000,
        channel: Channel::Telegram,
        channel_tenant_id: inbound.channel_tenant_id.clone(),
        channel_conversation_id: inbound.channel_conversation_id.clone(),
        request_id: inbound.request_id.clone(),
        response_id: "resp-1".to_string(),
        kind: OutboundKind::Error,
        body: "rejected: missing_scope".to_string(),
        attachments: vec![],
        correlation: inbound.correlation(Some(CommandId::new("cmd-00000001"))),
        metadata: Default::default(),
    };

    let json = serde_json::to_string(&envelope).unwrap();
    let back: OutboundEnvelope = serde_json::from_str(&json).unwrap();
    assert_eq!(envelope, back);
}

#[test]
fn journal_lines_are_self_describing() {
    let inbound = EnvelopeBuilder::new("mu! issue close mu-1").build();
    let entry = CommandEntry::Mutating {
        ts_ms: 1_000,
        command_id: CommandId::new("cmd-00000001"),
        op: "issue.close".to_string(),
        payload: Some(serde_json::json!({ "issue": "mu-1" })),
        correlation: inbound.correlation(Some(CommandId::new("cmd-00000001"))),
    };

    let line = serde_json::to_value(&entry).unwrap();
    // Any consumer can attribute the line without outside context
    assert_eq!(line["kind"], "domain.mutating");
    assert_eq!(line["correlation"]["channel"], "telegram");
    assert_eq!(line["correlation"]["request_id"], "req-1");
    assert_eq!(line["correlation"]["command_id"], "cmd-00000001");
}
