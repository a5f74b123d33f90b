// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generation supervisor: tracks the active generation and at most one
//! pending reload attempt.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mu_core::{
    GenerationIdentity, ReloadAttempt, ReloadAttemptId, ReloadAttemptState, ReloadOutcome,
};

/// Errors from supervisor operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("no pending reload attempt")]
    NoPending,
    #[error("attempt {0} is not the pending attempt")]
    UnknownAttempt(ReloadAttemptId),
    #[error("attempt {0} is not in the required state")]
    WrongState(ReloadAttemptId),
}

/// Result of `begin_reload`: the (possibly pre-existing) attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BeginReload {
    pub attempt: ReloadAttempt,
    pub coalesced: bool,
}

/// Serializable supervisor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorSnapshot {
    pub active_generation: GenerationIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<ReloadAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reload: Option<ReloadAttempt>,
}

struct SupervisorState {
    active: GenerationIdentity,
    next_seq: u64,
    attempt_counter: u64,
    pending: Option<ReloadAttempt>,
    last: Option<ReloadAttempt>,
}

/// The generation supervisor.
pub struct GenerationSupervisor {
    name: String,
    inner: Mutex<SupervisorState>,
}

impl GenerationSupervisor {
    /// Start supervising with generation `<name>-gen-0` active.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let active = GenerationIdentity::for_seq(&name, 0);
        Self {
            name,
            inner: Mutex::new(SupervisorState {
                active,
                next_seq: 1,
                attempt_counter: 0,
                pending: None,
                last: None,
            }),
        }
    }

    /// Plan a reload. Overlapping calls coalesce onto the pending
    /// attempt.
    pub fn begin_reload(&self, reason: &str, now_ms: u64) -> BeginReload {
        let mut state = self.inner.lock();
        if let Some(pending) = &state.pending {
            return BeginReload {
                attempt: pending.clone(),
                coalesced: true,
            };
        }

        state.attempt_counter += 1;
        let seq = state.next_seq;
        state.next_seq += 1;
        let attempt = ReloadAttempt {
            attempt_id: ReloadAttemptId::new(format!(
                "{}-reload-{}",
                self.name, state.attempt_counter
            )),
            reason: reason.to_string(),
            state: ReloadAttemptState::Planned,
            requested_at_ms: now_ms,
            swapped_at_ms: None,
            finished_at_ms: None,
            from_generation: state.active.clone(),
            to_generation: GenerationIdentity::for_seq(&self.name, seq),
        };
        state.pending = Some(attempt.clone());
        BeginReload {
            attempt,
            coalesced: false,
        }
    }

    /// Promote the attempt's target generation to active.
    pub fn mark_swap_installed(
        &self,
        attempt_id: &ReloadAttemptId,
        now_ms: u64,
    ) -> Result<(), SupervisorError> {
        let mut state = self.inner.lock();
        let pending = state.pending.as_mut().ok_or(SupervisorError::NoPending)?;
        if pending.attempt_id != *attempt_id {
            return Err(SupervisorError::UnknownAttempt(attempt_id.clone()));
        }
        if pending.state != ReloadAttemptState::Planned {
            return Err(SupervisorError::WrongState(attempt_id.clone()));
        }
        pending.state = ReloadAttemptState::Swapped;
        pending.swapped_at_ms = Some(now_ms);
        let to = pending.to_generation.clone();
        state.active = to;
        Ok(())
    }

    /// Restore the attempt's source generation after a failed swap.
    pub fn rollback_swap_installed(
        &self,
        attempt_id: &ReloadAttemptId,
    ) -> Result<(), SupervisorError> {
        let mut state = self.inner.lock();
        let pending = state.pending.as_mut().ok_or(SupervisorError::NoPending)?;
        if pending.attempt_id != *attempt_id {
            return Err(SupervisorError::UnknownAttempt(attempt_id.clone()));
        }
        if pending.state != ReloadAttemptState::Swapped {
            return Err(SupervisorError::WrongState(attempt_id.clone()));
        }
        let from = pending.from_generation.clone();
        state.active = from;
        Ok(())
    }

    /// Record the terminal outcome and clear the pending slot.
    pub fn finish_reload(
        &self,
        attempt_id: &ReloadAttemptId,
        outcome: ReloadOutcome,
        now_ms: u64,
    ) -> Result<ReloadAttempt, SupervisorError> {
        let mut state = self.inner.lock();
        let pending = state.pending.as_mut().ok_or(SupervisorError::NoPending)?;
        if pending.attempt_id != *attempt_id {
            return Err(SupervisorError::UnknownAttempt(attempt_id.clone()));
        }
        pending.state = match outcome {
            ReloadOutcome::Success => ReloadAttemptState::Completed,
            ReloadOutcome::Failure => ReloadAttemptState::Failed,
        };
        pending.finished_at_ms = Some(now_ms);
        let finished = pending.clone();
        state.last = Some(finished.clone());
        state.pending = None;
        Ok(finished)
    }

    pub fn active_generation(&self) -> GenerationIdentity {
        self.inner.lock().active.clone()
    }

    pub fn pending(&self) -> Option<ReloadAttempt> {
        self.inner.lock().pending.clone()
    }

    pub fn snapshot(&self) -> SupervisorSnapshot {
        let state = self.inner.lock();
        SupervisorSnapshot {
            active_generation: state.active.clone(),
            pending: state.pending.clone(),
            last_reload: state.last.clone(),
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
