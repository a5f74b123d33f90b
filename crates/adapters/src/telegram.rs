// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telegram webhook adapter.
//!
//! Verification is Telegram's shared-secret header
//! (`X-Telegram-Bot-Api-Secret-Token`). Updates are deduped by
//! `update_id` in the ingress log before the pipeline sees them;
//! malformed payloads are recorded as dead ingress lines and acked so
//! Telegram stops redelivering.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::traits::{
    AdapterAck, AdapterError, AdapterRequest, AdapterSpec, ChannelAdapter, InboundHandler,
    OutboundSink,
};
use crate::verify::{content_fingerprint, verify_shared_secret};
use mu_core::{
    Channel, Clock, CommandPipelineResult, InboundEnvelope, OutboundEnvelope, OutboundKind,
    ENVELOPE_VERSION,
};
use mu_storage::{AuditLog, IngressLog};

/// Header Telegram echoes the configured webhook secret in.
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Telegram adapter configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Webhook secret token registered with `setWebhook`.
    pub secret_token: String,
    /// Tenant this webhook serves (one bot per tenant).
    pub tenant_id: String,
    /// Repository root commands run against.
    pub repo_root: PathBuf,
}

/// Inbound Telegram update (the fields the control plane reads).
#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<From>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct From {
    id: i64,
}

/// Telegram webhook adapter.
pub struct TelegramAdapter<H: InboundHandler, S: OutboundSink, C: Clock> {
    config: TelegramConfig,
    handler: Arc<H>,
    sink: Arc<S>,
    audit: Arc<Mutex<AuditLog>>,
    ingress: Arc<Mutex<IngressLog>>,
    clock: C,
}

impl<H: InboundHandler, S: OutboundSink, C: Clock> TelegramAdapter<H, S, C> {
    pub fn new(
        config: TelegramConfig,
        handler: Arc<H>,
        sink: Arc<S>,
        audit: Arc<Mutex<AuditLog>>,
        ingress: Arc<Mutex<IngressLog>>,
        clock: C,
    ) -> Self {
        Self {
            config,
            handler,
            sink,
            audit,
            ingress,
            clock,
        }
    }

    fn envelope_for(&self, update_id: i64, message: &Message, now_ms: u64) -> InboundEnvelope {
        let chat_id = message.chat.id.to_string();
        let actor_id = message
            .from
            .as_ref()
            .map(|f| f.id.to_string())
            .unwrap_or_else(|| chat_id.clone());
        let text = message.text.clone().unwrap_or_default();

        InboundEnvelope {
            v: ENVELOPE_VERSION,
            received_at_ms: now_ms,
            request_id: format!("tg-{update_id}"),
            delivery_id: update_id.to_string(),
            channel: Channel::Telegram,
            channel_tenant_id: self.config.tenant_id.clone(),
            channel_conversation_id: chat_id.clone(),
            actor_id: actor_id.clone(),
            actor_binding_id: None,
            assurance_tier: mu_core::AssuranceTier::TierC,
            repo_root: self.config.repo_root.clone(),
            command_text: text.clone(),
            scope_required: None,
            scope_effective: None,
            target_type: None,
            target_id: None,
            idempotency_key: format!("telegram:{}:{update_id}", self.config.tenant_id),
            fingerprint: content_fingerprint(&[&chat_id, &actor_id, &text]),
            attachments: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    fn audit_event(&self, event: &str, reason: Option<String>, now_ms: u64) {
        let mut audit = self.audit.lock();
        if let Err(e) = audit.record(Channel::Telegram, event, reason, None, now_ms) {
            tracing::warn!(error = %e, "audit append failed");
        }
    }

    /// Enqueue the reply envelope for out-of-band delivery.
    fn enqueue_reply(
        &self,
        inbound: &InboundEnvelope,
        result: &CommandPipelineResult,
        now_ms: u64,
    ) -> Result<(), AdapterError> {
        let Some(body) = render_reply(result) else {
            return Ok(());
        };
        let kind = match result {
            CommandPipelineResult::Completed { .. }
            | CommandPipelineResult::Cancelled { .. }
            | CommandPipelineResult::OperatorResponse { .. } => OutboundKind::Result,
            CommandPipelineResult::AwaitingConfirmation { .. }
            | CommandPipelineResult::Deferred { .. } => OutboundKind::Ack,
            _ => OutboundKind::Error,
        };
        let command_id = result.record().map(|r| r.command_id.clone());
        let envelope = OutboundEnvelope {
            v: ENVELOPE_VERSION,
            ts_ms: now_ms,
            channel: Channel::Telegram,
            channel_tenant_id: inbound.channel_tenant_id.clone(),
            channel_conversation_id: inbound.channel_conversation_id.clone(),
            request_id: inbound.request_id.clone(),
            response_id: format!("resp-{}", inbound.request_id),
            kind,
            body,
            attachments: Vec::new(),
            correlation: inbound.correlation(command_id),
            metadata: HashMap::new(),
        };
        self.sink
            .enqueue(&format!("telegram:resp:{}", inbound.request_id), envelope)?;
        Ok(())
    }
}

/// Human-readable fallback body for each pipeline result.
fn render_reply(result: &CommandPipelineResult) -> Option<String> {
    match result {
        CommandPipelineResult::Completed { record } => Some(match &record.result {
            Some(value) => format!("done: {value}"),
            None => "done".to_string(),
        }),
        CommandPipelineResult::AwaitingConfirmation { record } => Some(format!(
            "confirm with: confirm {}",
            record.command_id.as_str()
        )),
        CommandPipelineResult::Deferred { record } => Some(format!(
            "busy; retrying at {}",
            record.retry_at_ms.unwrap_or_default()
        )),
        CommandPipelineResult::Failed { record } => Some(format!(
            "failed: {}",
            record.error_code.as_deref().unwrap_or("unknown")
        )),
        CommandPipelineResult::Cancelled { record } => {
            Some(format!("cancelled {}", record.command_id.as_str()))
        }
        CommandPipelineResult::Invalid { reason } | CommandPipelineResult::Denied { reason } => {
            Some(format!("rejected: {reason}"))
        }
        CommandPipelineResult::OperatorResponse { message } => Some(message.clone()),
        // Duplicates were already answered on first delivery
        CommandPipelineResult::Noop { .. } => None,
    }
}

#[async_trait]
impl<H: InboundHandler, S: OutboundSink, C: Clock + 'static> ChannelAdapter
    for TelegramAdapter<H, S, C>
{
    fn spec(&self) -> AdapterSpec {
        AdapterSpec {
            channel: Channel::Telegram,
            route: "/webhooks/telegram",
            ingress_payload: "telegram_update",
            verification: "shared_secret_header",
            ack_format: "json_ok",
            deferred_delivery: true,
        }
    }

    async fn ingest(&self, request: AdapterRequest) -> Result<AdapterAck, AdapterError> {
        let now_ms = self.clock.epoch_ms();

        let received = request
            .headers
            .get(SECRET_HEADER)
            .map(String::as_str)
            .unwrap_or_default();
        if let Err(e) = verify_shared_secret(&self.config.secret_token, received) {
            self.audit_event("verify:failed", Some(e.to_string()), now_ms);
            return Err(e.into());
        }

        let update: Update = match serde_json::from_str(&request.body) {
            Ok(u) => u,
            Err(e) => {
                {
                    let mut ingress = self.ingress.lock();
                    ingress.dead("unparsed", e.to_string(), now_ms)?;
                }
                self.audit_event("ingest:dead", Some(e.to_string()), now_ms);
                // Ack so Telegram stops redelivering a payload we can
                // never parse
                return Ok(AdapterAck::ok(
                    serde_json::json!({ "ok": false, "error": "malformed_update" }),
                ));
            }
        };

        let update_id = update.update_id.to_string();
        let Some(message) = update.message.as_ref() else {
            let mut ingress = self.ingress.lock();
            ingress.dead(&update_id, "no message", now_ms)?;
            return Ok(AdapterAck::ok(serde_json::json!({ "ok": true })));
        };

        let fresh = {
            let mut ingress = self.ingress.lock();
            ingress.accept(&update_id, now_ms)?
        };
        if !fresh {
            self.audit_event("ingest:duplicate", None, now_ms);
            return Ok(AdapterAck::ok(
                serde_json::json!({ "ok": true, "result": "duplicate_ingress" }),
            ));
        }

        let envelope = self.envelope_for(update.update_id, message, now_ms);
        let result = self.handler.handle(envelope.clone()).await?;

        self.enqueue_reply(&envelope, &result, now_ms)?;
        self.audit_event(&format!("ingest:{}", result.tag()), None, now_ms);

        let mut body = serde_json::json!({ "ok": true, "result": result.tag() });
        if let Some(record) = result.record() {
            body["command_id"] = serde_json::Value::String(record.command_id.to_string());
        }
        Ok(AdapterAck::ok(body))
    }
}

#[cfg(test)]
#[path = "telegram_tests.rs"]
mod tests;
