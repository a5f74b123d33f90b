// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized inbound/outbound envelopes and the correlation block.
//!
//! Adapters translate channel wire formats into these types; everything
//! downstream of an adapter is channel-agnostic. Both envelopes and the
//! correlation embedded in journal entries round-trip through serde
//! unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::channel::Channel;
use crate::command::CommandId;
use crate::error::ErrorCode;
use crate::identity::{AssuranceTier, BindingId};

/// Schema version for both envelope directions.
pub const ENVELOPE_VERSION: u32 = 1;

/// Metadata key a non-conversational channel must set to route raw text
/// to the operator backend.
pub const INGRESS_OVERRIDE_KEY: &str = "ingress";

/// Required value for [`INGRESS_OVERRIDE_KEY`].
pub const INGRESS_OVERRIDE_VALUE: &str = "conversational";

/// An attachment carried alongside a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
}

/// Normalized, channel-agnostic inbound request.
///
/// Invariant: `idempotency_key` and `fingerprint` are stable functions of
/// semantic content; a physical retry of the same message must produce
/// identical values for both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub v: u32,
    pub received_at_ms: u64,
    pub request_id: String,
    pub delivery_id: String,
    pub channel: Channel,
    pub channel_tenant_id: String,
    pub channel_conversation_id: String,
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_binding_id: Option<BindingId>,
    pub assurance_tier: AssuranceTier,
    pub repo_root: PathBuf,
    pub command_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_required: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_effective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub idempotency_key: String,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl InboundEnvelope {
    /// Validate structural requirements before the pipeline touches the
    /// envelope. Content-level checks (empty command text, unknown keys)
    /// belong to invocation classification and policy.
    pub fn validate(&self) -> Result<(), ErrorCode> {
        if self.v != ENVELOPE_VERSION {
            return Err(ErrorCode::SchemaInvalid);
        }
        if self.request_id.is_empty()
            || self.delivery_id.is_empty()
            || self.idempotency_key.is_empty()
            || self.fingerprint.is_empty()
        {
            return Err(ErrorCode::SchemaInvalid);
        }
        if self.channel_tenant_id.is_empty() || self.actor_id.is_empty() {
            return Err(ErrorCode::SchemaInvalid);
        }
        Ok(())
    }

    /// Whether raw text on this envelope may reach the operator backend.
    pub fn conversational_ingress(&self) -> bool {
        self.channel.is_conversational()
            || self
                .metadata
                .get(INGRESS_OVERRIDE_KEY)
                .is_some_and(|v| v == INGRESS_OVERRIDE_VALUE)
    }

    /// Build the correlation block for journal entries derived from this
    /// envelope.
    pub fn correlation(&self, command_id: Option<CommandId>) -> Correlation {
        Correlation {
            channel: self.channel,
            channel_tenant_id: self.channel_tenant_id.clone(),
            channel_conversation_id: self.channel_conversation_id.clone(),
            actor_id: self.actor_id.clone(),
            actor_binding_id: self.actor_binding_id.clone(),
            request_id: self.request_id.clone(),
            delivery_id: self.delivery_id.clone(),
            command_id,
        }
    }
}

/// Kind of outbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    Ack,
    Result,
    Error,
}

/// Normalized outbound reply, enqueued into the outbox for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub v: u32,
    pub ts_ms: u64,
    pub channel: Channel,
    pub channel_tenant_id: String,
    pub channel_conversation_id: String,
    pub request_id: String,
    pub response_id: String,
    pub kind: OutboundKind,
    /// Human-readable fallback; always present even when a channel renders
    /// a richer format.
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    pub correlation: Correlation,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Provenance envelope embedded in every journal entry and outbound reply
/// so any line is self-describing for audit and replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub channel: Channel,
    pub channel_tenant_id: String,
    pub channel_conversation_id: String,
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_binding_id: Option<BindingId>,
    pub request_id: String,
    pub delivery_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
