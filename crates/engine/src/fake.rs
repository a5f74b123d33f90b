// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake command executor for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::executor::{CommandExecutor, ExecutionOutcome, MutationEffect};
use mu_core::{CommandId, CommandRecord};

struct FakeExecutorState {
    /// Scripted outcomes per command key, consumed front-to-back.
    scripts: HashMap<String, VecDeque<ExecutionOutcome>>,
    executed: Vec<CommandId>,
}

/// Fake executor with per-key scripted outcomes.
///
/// Unscripted keys complete with `{"ok": true}` and, for mutating
/// records, a single `<key>.apply` mutation effect.
#[derive(Clone)]
pub struct FakeExecutor {
    inner: Arc<Mutex<FakeExecutorState>>,
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeExecutorState {
                scripts: HashMap::new(),
                executed: Vec::new(),
            })),
        }
    }
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the next execution of `key`.
    pub fn push_outcome(&self, key: &str, outcome: ExecutionOutcome) {
        self.inner
            .lock()
            .scripts
            .entry(key.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Command ids executed, in order.
    pub fn executed(&self) -> Vec<CommandId> {
        self.inner.lock().executed.clone()
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn execute(&self, record: &CommandRecord) -> ExecutionOutcome {
        let mut state = self.inner.lock();
        state.executed.push(record.command_id.clone());
        if let Some(outcome) = state
            .scripts
            .get_mut(&record.command_key)
            .and_then(|q| q.pop_front())
        {
            return outcome;
        }

        let mutations = if record.mutating {
            vec![MutationEffect {
                op: format!("{}.apply", record.command_key.replace(' ', ".")),
                payload: Some(serde_json::json!({ "args": record.args })),
            }]
        } else {
            Vec::new()
        };
        ExecutionOutcome::Completed {
            result: Some(serde_json::json!({ "ok": true })),
            mutations,
        }
    }
}
