// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup replay: rebuild command state from the journal and reconcile
//! non-terminal commands with exactly-once side effects.
//!
//! A command that already has any `domain.mutating` entry in the log is
//! reconciled in place without invoking the executor; a second restart
//! therefore performs zero side effects for it.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::executor::{CommandExecutor, ExecutionOutcome};
use crate::pipeline::{PipelineError, PipelineStores};
use mu_core::{CommandEntry, CommandId, CommandRecord, CommandState};

/// What replay did to each recovery candidate.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplayReport {
    /// Completed without execution: a mutating entry was already
    /// journaled.
    pub reconciled: Vec<CommandId>,
    /// Re-executed through the caller's executor.
    pub executed: Vec<CommandId>,
    /// `awaiting_confirmation` past its deadline.
    pub expired: Vec<CommandId>,
    /// Still pending (unexpired confirmations, future retries).
    pub pending: Vec<CommandId>,
}

/// Walk the lifecycle DAG from the record's state to `target`,
/// journaling every intermediate transition.
fn advance_to(
    stores: &mut PipelineStores,
    record: &mut CommandRecord,
    target: CommandState,
    now_ms: u64,
) -> Result<(), PipelineError> {
    while record.state != target {
        let next = if record.state.can_transition(target) {
            target
        } else {
            match record.state {
                CommandState::Deferred => CommandState::Queued,
                CommandState::Queued => CommandState::InProgress,
                CommandState::Accepted => CommandState::Queued,
                // No legal path; surface the transition error
                _ => target,
            }
        };
        record.transition(next, now_ms)?;
        stores.journal_lifecycle(record, now_ms)?;
    }
    Ok(())
}

/// Replay recovery: reconcile or re-execute every non-terminal command.
pub async fn replay_startup<X: CommandExecutor>(
    stores: &Arc<Mutex<PipelineStores>>,
    executor: &X,
    now_ms: u64,
) -> Result<ReplayReport, PipelineError> {
    let candidates = { stores.lock().state.recovery_candidates() };
    let mut report = ReplayReport::default();

    for mut record in candidates {
        let command_id = record.command_id.clone();

        if record.state == CommandState::AwaitingConfirmation {
            let overdue = record
                .confirmation_expires_at_ms
                .is_some_and(|deadline| now_ms >= deadline);
            if overdue {
                record.transition(CommandState::Expired, now_ms)?;
                let mut stores = stores.lock();
                stores.journal_lifecycle(&record, now_ms)?;
                stores.flush()?;
                report.expired.push(command_id);
            } else {
                report.pending.push(command_id);
            }
            continue;
        }

        let has_mutating = { stores.lock().state.has_mutating(&command_id) };
        if has_mutating {
            record.result = Some(serde_json::json!({
                "reconciled": true,
                "reason": "mutating_event_present",
            }));
            let mut stores = stores.lock();
            advance_to(&mut stores, &mut record, CommandState::Completed, now_ms)?;
            stores.flush()?;
            report.reconciled.push(command_id);
            continue;
        }

        // Deferred commands with a future retry stay parked
        if record.state == CommandState::Deferred
            && record.retry_at_ms.is_some_and(|t| t > now_ms)
        {
            report.pending.push(command_id);
            continue;
        }

        let outcome = executor.execute(&record).await;
        let mut stores = stores.lock();
        match outcome {
            ExecutionOutcome::Completed { result, mutations } => {
                record.result = result;
                advance_to(&mut stores, &mut record, CommandState::Completed, now_ms)?;
                for effect in mutations {
                    stores.commands.append(&CommandEntry::Mutating {
                        ts_ms: now_ms,
                        command_id: record.command_id.clone(),
                        op: effect.op,
                        payload: effect.payload,
                        correlation: record.correlation.clone(),
                    })?;
                }
            }
            ExecutionOutcome::Failed { error_code } => {
                record.error_code = Some(error_code);
                advance_to(&mut stores, &mut record, CommandState::Failed, now_ms)?;
            }
            ExecutionOutcome::Deferred { retry_delay_ms } => {
                record.retry_at_ms = Some(now_ms + retry_delay_ms);
                advance_to(&mut stores, &mut record, CommandState::Deferred, now_ms)?;
            }
        }
        stores.flush()?;
        report.executed.push(command_id);
    }

    Ok(report)
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
