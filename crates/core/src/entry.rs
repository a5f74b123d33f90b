// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal entry types.
//!
//! Every persisted line is internally tagged so any journal line is
//! self-describing: `{"kind": "command.lifecycle", ...}`.

use serde::{Deserialize, Serialize};

use crate::command::{CommandId, CommandRecord};
use crate::channel::Channel;
use crate::envelope::Correlation;
use crate::identity::{BindingId, IdentityBinding};

/// A line in the command journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CommandEntry {
    /// A lifecycle transition. Carries the full record snapshot so replay
    /// can rebuild state from the latest entry per command.
    #[serde(rename = "command.lifecycle")]
    Lifecycle {
        ts_ms: u64,
        record: CommandRecord,
    },

    /// A mutating domain side effect, appended in the same single-writer
    /// flush section as the terminal lifecycle transition it belongs to.
    #[serde(rename = "domain.mutating")]
    Mutating {
        ts_ms: u64,
        command_id: CommandId,
        /// Domain operation name, e.g. `issue.close`.
        op: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
        correlation: Correlation,
    },
}

impl CommandEntry {
    pub fn command_id(&self) -> &CommandId {
        match self {
            CommandEntry::Lifecycle { record, .. } => &record.command_id,
            CommandEntry::Mutating { command_id, .. } => command_id,
        }
    }
}

/// A line in the identity journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IdentityEvent {
    #[serde(rename = "identity:linked")]
    Linked { ts_ms: u64, binding: IdentityBinding },

    #[serde(rename = "identity:unlinked")]
    Unlinked {
        ts_ms: u64,
        binding_id: BindingId,
        cause: String,
    },

    #[serde(rename = "identity:revoked")]
    Revoked {
        ts_ms: u64,
        binding_id: BindingId,
        reason: String,
    },
}

/// A line in the adapter audit journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AuditEntry {
    #[serde(rename = "adapter.audit")]
    Audit {
        ts_ms: u64,
        channel: Channel,
        /// What happened, e.g. `ingest:accepted`, `verify:failed`.
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
