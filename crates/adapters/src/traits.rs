// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter contract: static spec plus an ingest entry point.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use mu_core::{Channel, CommandPipelineResult, ErrorCode, InboundEnvelope};

/// Static description of an adapter's wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterSpec {
    pub channel: Channel,
    /// Ingress route the collaborator HTTP server mounts,
    /// e.g. `/webhooks/telegram`.
    pub route: &'static str,
    /// Shape of the ingress payload, e.g. `telegram_update`.
    pub ingress_payload: &'static str,
    /// Verification scheme, e.g. `shared_secret_header` or `hmac_sha256`.
    pub verification: &'static str,
    /// Ack format the channel expects, e.g. `json_ok`.
    pub ack_format: &'static str,
    /// Whether replies are delivered out-of-band via the outbox.
    pub deferred_delivery: bool,
}

/// A channel-specific inbound request, as handed over by the HTTP
/// collaborator: headers plus the raw body.
#[derive(Debug, Clone, Default)]
pub struct AdapterRequest {
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Channel-agnostic ack returned to the collaborator server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterAck {
    pub status: u16,
    pub body: serde_json::Value,
}

impl AdapterAck {
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    pub fn denied(reason: ErrorCode) -> Self {
        Self {
            status: 403,
            body: serde_json::json!({ "ok": false, "error": reason.as_str() }),
        }
    }
}

/// Errors an adapter can surface to the collaborator server.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("verification failed: {0}")]
    Verification(#[from] crate::verify::VerifyError),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("storage error: {0}")]
    Storage(#[from] mu_storage::JournalError),
    #[error("pipeline error: {0}")]
    Handler(#[from] HandlerError),
}

/// Infrastructure failure inside the pipeline.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// The pipeline seam adapters call into.
#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        envelope: InboundEnvelope,
    ) -> Result<CommandPipelineResult, HandlerError>;
}

/// The outbox seam adapters enqueue replies through. Implementations
/// dedupe by key and wake the dispatcher.
pub trait OutboundSink: Send + Sync + 'static {
    fn enqueue(
        &self,
        dedupe_key: &str,
        envelope: mu_core::OutboundEnvelope,
    ) -> Result<(), HandlerError>;
}

/// A channel adapter: static spec plus ingest.
#[async_trait]
pub trait ChannelAdapter: Send + Sync + 'static {
    /// The adapter's wire contract.
    fn spec(&self) -> AdapterSpec;

    /// Verify, translate, dispatch, and ack one inbound request.
    async fn ingest(&self, request: AdapterRequest) -> Result<AdapterAck, AdapterError>;
}

#[cfg(test)]
#[path = "traits_tests.rs"]
mod tests;
