// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator backend seam for conversational turns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mu_core::InboundEnvelope;

/// What the operator decided to do with a conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorDecision {
    /// Answer the user directly.
    Response { message: String },
    /// Turn the text into a command invocation to run through the
    /// pipeline's command paths.
    Command { text: String },
    /// Refuse the turn.
    Reject { reason: String },
}

/// One operator turn with its session provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorReply {
    pub session_id: String,
    pub turn_id: String,
    pub decision: OperatorDecision,
}

/// Conversational backend. All variation flows through the decision
/// value; there is no dynamic dispatch on business objects.
#[async_trait]
pub trait OperatorBackend: Send + Sync + 'static {
    async fn handle_inbound(&self, envelope: &InboundEnvelope) -> OperatorReply;
}
