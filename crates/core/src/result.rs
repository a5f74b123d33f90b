// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged pipeline results.
//!
//! Nothing is thrown across the pipeline boundary; adapters translate
//! these values into their channel's ack format.

use serde::{Deserialize, Serialize};

use crate::command::{CommandId, CommandRecord};
use crate::error::ErrorCode;

/// Outcome of handling one inbound envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandPipelineResult {
    /// Command executed to completion (readonly or mutation).
    Completed { record: CommandRecord },

    /// Mutation parked until `confirm <command_id>` arrives.
    AwaitingConfirmation { record: CommandRecord },

    /// Command deferred; `record.retry_at_ms` says when it re-queues.
    Deferred { record: CommandRecord },

    /// Command failed with a semantic error.
    Failed { record: CommandRecord },

    /// Command cancelled by the caller.
    Cancelled { record: CommandRecord },

    /// Nothing to do (duplicate delivery, whitespace input).
    Noop {
        reason: ErrorCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command_id: Option<CommandId>,
    },

    /// Envelope or invocation failed validation.
    Invalid { reason: ErrorCode },

    /// Request refused; never retried.
    Denied { reason: ErrorCode },

    /// Conversational turn answered by the operator backend.
    OperatorResponse { message: String },
}

impl CommandPipelineResult {
    /// The record carried by record-bearing variants.
    pub fn record(&self) -> Option<&CommandRecord> {
        match self {
            CommandPipelineResult::Completed { record }
            | CommandPipelineResult::AwaitingConfirmation { record }
            | CommandPipelineResult::Deferred { record }
            | CommandPipelineResult::Failed { record }
            | CommandPipelineResult::Cancelled { record } => Some(record),
            _ => None,
        }
    }

    /// Short wire tag for acks and audit entries.
    pub fn tag(&self) -> &'static str {
        match self {
            CommandPipelineResult::Completed { .. } => "completed",
            CommandPipelineResult::AwaitingConfirmation { .. } => "awaiting_confirmation",
            CommandPipelineResult::Deferred { .. } => "deferred",
            CommandPipelineResult::Failed { .. } => "failed",
            CommandPipelineResult::Cancelled { .. } => "cancelled",
            CommandPipelineResult::Noop { .. } => "noop",
            CommandPipelineResult::Invalid { .. } => "invalid",
            CommandPipelineResult::Denied { .. } => "denied",
            CommandPipelineResult::OperatorResponse { .. } => "operator_response",
        }
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
