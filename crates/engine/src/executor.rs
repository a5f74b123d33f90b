// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command executor seam.
//!
//! The control plane does not define business mutation semantics; the
//! caller provides an executor and the pipeline guarantees each command
//! runs at most once terminally or is deterministically reconciled.

use async_trait::async_trait;

use mu_core::CommandRecord;

/// A mutating side effect the executor performed. Journaled as a
/// `domain.mutating` entry in the same flush section as the terminal
/// lifecycle transition.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEffect {
    /// Domain operation name, e.g. `issue.close`.
    pub op: String,
    pub payload: Option<serde_json::Value>,
}

/// Outcome of executing one command.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed {
        result: Option<serde_json::Value>,
        mutations: Vec<MutationEffect>,
    },
    /// Semantic failure; never retried by the pipeline.
    Failed { error_code: String },
    /// Transient infrastructure failure; the command re-queues after the
    /// delay.
    Deferred { retry_delay_ms: u64 },
}

/// Domain executor for readonly queries and mutations.
#[async_trait]
pub trait CommandExecutor: Send + Sync + 'static {
    async fn execute(&self, record: &CommandRecord) -> ExecutionOutcome;
}
