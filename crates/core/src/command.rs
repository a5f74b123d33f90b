// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command records and the lifecycle state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::Correlation;

crate::define_id! {
    /// Monotonic identifier for a command traversing the pipeline.
    pub struct CommandId;
}

/// Lifecycle state of a command.
///
/// Transitions obey a DAG; once a command reaches a terminal state no
/// further transitions are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    Accepted,
    Queued,
    AwaitingConfirmation,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Deferred,
}

impl CommandState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandState::Completed
                | CommandState::Failed
                | CommandState::Cancelled
                | CommandState::Expired
        )
    }

    /// Whether `self → to` is a permitted edge of the lifecycle DAG.
    pub fn can_transition(&self, to: CommandState) -> bool {
        use CommandState::*;
        match self {
            Accepted => matches!(to, Queued | AwaitingConfirmation | Completed | Failed),
            AwaitingConfirmation => matches!(to, Queued | Cancelled | Expired),
            Queued => matches!(to, InProgress | Deferred | Cancelled),
            InProgress => matches!(to, Completed | Failed | Cancelled | Deferred),
            Deferred => matches!(to, Queued),
            Completed | Failed | Cancelled | Expired => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandState::Accepted => "accepted",
            CommandState::Queued => "queued",
            CommandState::AwaitingConfirmation => "awaiting_confirmation",
            CommandState::InProgress => "in_progress",
            CommandState::Completed => "completed",
            CommandState::Failed => "failed",
            CommandState::Cancelled => "cancelled",
            CommandState::Expired => "expired",
            CommandState::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for CommandState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("command {id} is terminal in state {state}")]
    Terminal { id: String, state: CommandState },
    #[error("command {id}: illegal transition {from} -> {to}")]
    Illegal {
        id: String,
        from: CommandState,
        to: CommandState,
    },
}

/// A single authorized work unit traversing the pipeline state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command_id: CommandId,
    pub state: CommandState,
    /// Resolved command key (whitespace-joined token prefix).
    pub command_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub mutating: bool,
    pub attempt: u32,
    /// Wire error-code string; domain executors may carry codes outside
    /// the built-in [`crate::ErrorCode`] set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_expires_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_turn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_invocation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_command_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_root_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    /// Full inbound provenance.
    pub correlation: Correlation,
}

impl CommandRecord {
    /// Create a freshly accepted record.
    pub fn accepted(
        command_id: CommandId,
        command_key: impl Into<String>,
        args: Vec<String>,
        mutating: bool,
        correlation: Correlation,
        now_ms: u64,
    ) -> Self {
        Self {
            command_id,
            state: CommandState::Accepted,
            command_key: command_key.into(),
            args,
            mutating,
            attempt: 0,
            error_code: None,
            retry_at_ms: None,
            confirmation_expires_at_ms: None,
            operator_session_id: None,
            operator_turn_id: None,
            cli_invocation_id: None,
            cli_command_kind: None,
            run_root_id: None,
            result: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            correlation,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a lifecycle transition, validating the DAG.
    pub fn transition(&mut self, to: CommandState, now_ms: u64) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal {
                id: self.command_id.to_string(),
                state: self.state,
            });
        }
        if !self.state.can_transition(to) {
            return Err(TransitionError::Illegal {
                id: self.command_id.to_string(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.updated_at_ms = now_ms;
        Ok(())
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
