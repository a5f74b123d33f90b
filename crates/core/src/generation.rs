// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generation identities and reload attempts.
//!
//! A generation is a versioned instance of the running control plane;
//! reloads publish a new generation and swap a single pointer.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a reload attempt.
    pub struct ReloadAttemptId;
}

/// Identity of a control-plane generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIdentity {
    pub generation_id: String,
    pub generation_seq: u64,
}

impl GenerationIdentity {
    /// Build the identity for `seq` under the given supervisor name:
    /// `<supervisor>-gen-<seq>`.
    pub fn for_seq(supervisor: &str, seq: u64) -> Self {
        Self {
            generation_id: format!("{supervisor}-gen-{seq}"),
            generation_seq: seq,
        }
    }
}

/// State of a reload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadAttemptState {
    Planned,
    Swapped,
    Completed,
    Failed,
}

/// Terminal outcome of a reload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadOutcome {
    Success,
    Failure,
}

/// One reload attempt from plan through terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadAttempt {
    pub attempt_id: ReloadAttemptId,
    pub reason: String,
    pub state: ReloadAttemptState,
    pub requested_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swapped_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    pub from_generation: GenerationIdentity,
    pub to_generation: GenerationIdentity,
}

#[cfg(test)]
#[path = "generation_tests.rs"]
mod tests;
