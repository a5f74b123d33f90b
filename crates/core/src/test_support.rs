// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across crates.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::channel::Channel;
use crate::envelope::{InboundEnvelope, ENVELOPE_VERSION};
use crate::identity::{AssuranceTier, BindingId};

/// Builder for inbound envelopes with sensible test defaults.
pub struct EnvelopeBuilder {
    envelope: InboundEnvelope,
}

impl EnvelopeBuilder {
    pub fn new(command_text: impl Into<String>) -> Self {
        let text = command_text.into();
        Self {
            envelope: InboundEnvelope {
                v: ENVELOPE_VERSION,
                received_at_ms: 1_000_000,
                request_id: "req-1".to_string(),
                delivery_id: "del-1".to_string(),
                channel: Channel::Telegram,
                channel_tenant_id: "tenant-1".to_string(),
                channel_conversation_id: "conv-1".to_string(),
                actor_id: "actor-1".to_string(),
                actor_binding_id: Some(BindingId::new("bind-1")),
                assurance_tier: AssuranceTier::TierA,
                repo_root: PathBuf::from("/tmp/repo"),
                command_text: text.clone(),
                scope_required: None,
                scope_effective: None,
                target_type: None,
                target_id: None,
                idempotency_key: format!("key:{text}"),
                fingerprint: format!("fp:{text}"),
                attachments: Vec::new(),
                metadata: HashMap::new(),
            },
        }
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.envelope.channel = channel;
        self
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.envelope.channel_tenant_id = tenant.into();
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.envelope.actor_id = actor.into();
        self
    }

    pub fn binding(mut self, binding_id: Option<BindingId>) -> Self {
        self.envelope.actor_binding_id = binding_id;
        self
    }

    pub fn tier(mut self, tier: AssuranceTier) -> Self {
        self.envelope.assurance_tier = tier;
        self
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.envelope.request_id = id.into();
        self
    }

    pub fn idempotency(
        mut self,
        key: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        self.envelope.idempotency_key = key.into();
        self.envelope.fingerprint = fingerprint.into();
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envelope.metadata.insert(key.into(), value.into());
        self
    }

    pub fn repo_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.envelope.repo_root = root.into();
        self
    }

    pub fn build(self) -> InboundEnvelope {
        self.envelope
    }
}
