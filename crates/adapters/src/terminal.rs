// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal adapter for in-process sessions.
//!
//! Terminal lines never cross a trust boundary, so there is no wire
//! verification; identity comes from the reserved terminal binding.
//! Replies are returned inline in the ack rather than via the outbox.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::traits::{
    AdapterAck, AdapterError, AdapterRequest, AdapterSpec, ChannelAdapter, InboundHandler,
};
use crate::verify::content_fingerprint;
use mu_core::{
    terminal_binding, Channel, Clock, CommandPipelineResult, InboundEnvelope, ENVELOPE_VERSION,
};
use mu_storage::AuditLog;

/// One line typed into a terminal session.
#[derive(Debug, Clone)]
pub struct TerminalRequest {
    pub line: String,
    pub repo_root: PathBuf,
}

/// In-process terminal adapter.
pub struct TerminalAdapter<H: InboundHandler, C: Clock> {
    handler: Arc<H>,
    audit: Arc<Mutex<AuditLog>>,
    clock: C,
    seq: AtomicU64,
}

impl<H: InboundHandler, C: Clock> TerminalAdapter<H, C> {
    pub fn new(handler: Arc<H>, audit: Arc<Mutex<AuditLog>>, clock: C) -> Self {
        Self {
            handler,
            audit,
            clock,
            seq: AtomicU64::new(1),
        }
    }

    /// Submit one terminal line and get the pipeline result.
    pub async fn submit(
        &self,
        request: TerminalRequest,
    ) -> Result<CommandPipelineResult, AdapterError> {
        let now_ms = self.clock.epoch_ms();
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        let binding = terminal_binding();
        let request_id = format!("term-{now_ms}-{n}");

        let envelope = InboundEnvelope {
            v: ENVELOPE_VERSION,
            received_at_ms: now_ms,
            request_id: request_id.clone(),
            delivery_id: request_id.clone(),
            channel: Channel::Terminal,
            channel_tenant_id: binding.channel_tenant_id.clone(),
            channel_conversation_id: "terminal".to_string(),
            actor_id: binding.channel_actor_id.clone(),
            actor_binding_id: Some(binding.binding_id.clone()),
            assurance_tier: binding.assurance_tier,
            repo_root: request.repo_root,
            command_text: request.line.clone(),
            scope_required: None,
            scope_effective: None,
            target_type: None,
            target_id: None,
            // Terminal lines are never physically retried; each line is
            // its own claim.
            idempotency_key: request_id,
            fingerprint: content_fingerprint(&[&request.line]),
            attachments: Vec::new(),
            metadata: HashMap::new(),
        };

        let result = self.handler.handle(envelope).await?;

        {
            let mut audit = self.audit.lock();
            if let Err(e) = audit.record(
                Channel::Terminal,
                format!("ingest:{}", result.tag()),
                None,
                None,
                now_ms,
            ) {
                tracing::warn!(error = %e, "audit append failed");
            }
        }

        Ok(result)
    }
}

#[async_trait]
impl<H: InboundHandler, C: Clock + 'static> ChannelAdapter for TerminalAdapter<H, C> {
    fn spec(&self) -> AdapterSpec {
        AdapterSpec {
            channel: Channel::Terminal,
            route: "/terminal",
            ingress_payload: "terminal_line",
            verification: "none",
            ack_format: "text",
            deferred_delivery: false,
        }
    }

    async fn ingest(&self, request: AdapterRequest) -> Result<AdapterAck, AdapterError> {
        let repo_root = request
            .headers
            .get("x-mu-repo-root")
            .map(PathBuf::from)
            .unwrap_or_default();
        let result = self
            .submit(TerminalRequest {
                line: request.body,
                repo_root,
            })
            .await?;
        Ok(AdapterAck::ok(serde_json::to_value(&result).map_err(
            |e| AdapterError::Malformed(e.to_string()),
        )?))
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
