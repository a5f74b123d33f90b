// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbox records for durable at-least-once delivery.

use serde::{Deserialize, Serialize};

use crate::command::CommandId;
use crate::envelope::OutboundEnvelope;

crate::define_id! {
    /// Unique identifier for an outbox record.
    pub struct OutboxId;
}

/// Delivery state of an outbox record.
///
/// `Delivered` and `DeadLetter` are terminal. `InFlight` acts as a mutex:
/// a record never has two concurrent delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxState {
    Pending,
    InFlight,
    Delivered,
    DeadLetter,
}

impl OutboxState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutboxState::Delivered | OutboxState::DeadLetter)
    }
}

/// A durable outbound message with its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub outbox_id: OutboxId,
    /// Stable identity of the logical outbound message; re-enqueues with
    /// the same key collapse onto the original record.
    pub dedupe_key: String,
    pub state: OutboxState,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub next_attempt_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_of_outbox_id: Option<OutboxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_requested_by_command_id: Option<CommandId>,
    pub envelope: OutboundEnvelope,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl OutboxRecord {
    /// Create a fresh pending record.
    pub fn pending(
        outbox_id: OutboxId,
        dedupe_key: impl Into<String>,
        envelope: OutboundEnvelope,
        max_attempts: u32,
        now_ms: u64,
    ) -> Self {
        Self {
            outbox_id,
            dedupe_key: dedupe_key.into(),
            state: OutboxState::Pending,
            attempt_count: 0,
            max_attempts,
            next_attempt_at_ms: now_ms,
            last_error: None,
            dead_letter_reason: None,
            replay_of_outbox_id: None,
            replay_requested_by_command_id: None,
            envelope,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
