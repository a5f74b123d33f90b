// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command pipeline: parse, resolve, claim, authorize, execute,
//! journal.
//!
//! Every inbound envelope flows through here. The journaled stores sit
//! behind one `parking_lot::Mutex`, the single-writer section. Journal
//! entries for a command are appended (and flushed) before the pipeline
//! yields the terminal result to the caller, and mutating side effects
//! land in the same flush section as the terminal lifecycle transition.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::executor::{CommandExecutor, ExecutionOutcome};
use crate::mutation::MutationGate;
use crate::policy::{PolicyDecision, PolicyEngine, RateDecision};
use mu_adapters::{HandlerError, InboundHandler, OperatorBackend, OperatorDecision};
use mu_core::{
    parse_invocation, terminal_binding, Channel, Clock, CommandEntry, CommandId,
    CommandPipelineResult, CommandRecord, CommandState, ErrorCode, IdGen, IdentityBinding,
    InboundEnvelope, Invocation, InvocationMode, MonotonicIdGen, TransitionError,
};
use mu_storage::{
    ClaimOutcome, ControlPlanePaths, IdempotencyLedger, IdentityStore, Journal, JournalError,
    MaterializedCommands,
};

/// Default confirmation window: 15 minutes.
pub const DEFAULT_CONFIRMATION_TTL_MS: u64 = 15 * 60 * 1000;

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub confirmation_ttl_ms: u64,
    pub idempotency_ttl_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confirmation_ttl_ms: DEFAULT_CONFIRMATION_TTL_MS,
            idempotency_ttl_ms: mu_storage::DEFAULT_TTL_MS,
        }
    }
}

/// Unrecoverable pipeline failure (journal writes failing).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("state machine error: {0}")]
    Transition(#[from] TransitionError),
}

/// The journaled stores behind the single-writer section.
pub struct PipelineStores {
    pub commands: Journal<CommandEntry>,
    pub state: MaterializedCommands,
    pub idempotency: IdempotencyLedger,
    pub identity: IdentityStore,
}

impl PipelineStores {
    /// Open all stores for a repository, replaying the command journal.
    pub fn open(paths: &ControlPlanePaths) -> Result<Self, JournalError> {
        let entries = Journal::<CommandEntry>::load(&paths.commands)?;
        Ok(Self {
            commands: Journal::open(&paths.commands)?,
            state: MaterializedCommands::replay(&entries),
            idempotency: IdempotencyLedger::open(&paths.idempotency)?,
            identity: IdentityStore::open(&paths.identities)?,
        })
    }

    /// Append a lifecycle snapshot and fold it into live state.
    /// Not durable until `flush()`.
    pub fn journal_lifecycle(
        &mut self,
        record: &CommandRecord,
        now_ms: u64,
    ) -> Result<(), JournalError> {
        let entry = CommandEntry::Lifecycle {
            ts_ms: now_ms,
            record: record.clone(),
        };
        self.commands.append(&entry)?;
        self.state.apply_entry(&entry);
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), JournalError> {
        self.commands.flush()
    }
}

/// The command pipeline.
pub struct CommandPipeline<X, O, C>
where
    X: CommandExecutor,
    O: OperatorBackend,
    C: Clock,
{
    stores: Arc<Mutex<PipelineStores>>,
    policy: Arc<Mutex<PolicyEngine>>,
    executor: Arc<X>,
    operator: Option<Arc<O>>,
    gate: MutationGate,
    ids: MonotonicIdGen,
    clock: C,
    config: PipelineConfig,
    accepting: AtomicBool,
}

impl<X, O, C> CommandPipeline<X, O, C>
where
    X: CommandExecutor,
    O: OperatorBackend,
    C: Clock,
{
    pub fn new(
        stores: Arc<Mutex<PipelineStores>>,
        policy: Arc<Mutex<PolicyEngine>>,
        executor: Arc<X>,
        operator: Option<Arc<O>>,
        clock: C,
        config: PipelineConfig,
    ) -> Self {
        let ids = MonotonicIdGen::new("cmd");
        ids.seed(stores.lock().state.max_command_seq());
        Self {
            stores,
            policy,
            executor,
            operator,
            gate: MutationGate::new(),
            ids,
            clock,
            config,
            accepting: AtomicBool::new(true),
        }
    }

    /// Shared view of the stores (for replay, sweepers, queries).
    pub fn stores(&self) -> Arc<Mutex<PipelineStores>> {
        Arc::clone(&self.stores)
    }

    /// Refuse new inbounds (graceful shutdown).
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Handle one inbound envelope.
    pub async fn handle(
        &self,
        envelope: &InboundEnvelope,
    ) -> Result<CommandPipelineResult, PipelineError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Ok(CommandPipelineResult::Denied {
                reason: ErrorCode::BackpressureOverflow,
            });
        }

        // 1. Schema validation
        if let Err(reason) = envelope.validate() {
            return Ok(CommandPipelineResult::Invalid { reason });
        }

        // 2. Identity binding
        let binding = match self.resolve_binding(envelope) {
            Ok(b) => b,
            Err(reason) => return Ok(CommandPipelineResult::Denied { reason }),
        };

        // 3. Invocation classification
        let keys = self.policy.lock().keys();
        let invocation = parse_invocation(&envelope.command_text, &keys);

        match invocation {
            Invocation::Noop => Ok(CommandPipelineResult::Noop {
                reason: ErrorCode::EmptyInput,
                command_id: None,
            }),
            Invocation::Invalid { reason } => Ok(CommandPipelineResult::Invalid { reason }),
            Invocation::Conversational { .. } => self.operator_turn(envelope, &binding).await,
            Invocation::Confirm { command_id } => {
                let claim_id = CommandId::new(self.ids.next());
                if let Some(early) = self.claim(envelope, &claim_id)? {
                    return Ok(early);
                }
                self.confirm(envelope, &binding, &command_id).await
            }
            Invocation::Cancel { command_id } => {
                let claim_id = CommandId::new(self.ids.next());
                if let Some(early) = self.claim(envelope, &claim_id)? {
                    return Ok(early);
                }
                self.cancel(envelope, &binding, &command_id)
            }
            Invocation::Command { key, args, mode } => {
                let command_id = CommandId::new(self.ids.next());
                if let Some(early) = self.claim(envelope, &command_id)? {
                    return Ok(early);
                }
                self.run_command(envelope, &binding, command_id, &key, args, mode, None)
                    .await
            }
        }
    }

    // -- step 2: identity --

    fn resolve_binding(&self, envelope: &InboundEnvelope) -> Result<IdentityBinding, ErrorCode> {
        let reserved = terminal_binding();
        if envelope.channel == Channel::Terminal
            && reserved.triple()
                == (
                    envelope.channel,
                    envelope.channel_tenant_id.as_str(),
                    envelope.actor_id.as_str(),
                )
        {
            return match &envelope.actor_binding_id {
                Some(id) if *id != reserved.binding_id => Err(ErrorCode::IdentityNotLinked),
                _ => Ok(reserved),
            };
        }

        let stores = self.stores.lock();
        match stores.identity.resolve_active(
            envelope.channel,
            &envelope.channel_tenant_id,
            &envelope.actor_id,
        ) {
            Some(binding) => match &envelope.actor_binding_id {
                Some(id) if *id != binding.binding_id => Err(ErrorCode::IdentityNotLinked),
                _ => Ok(binding.clone()),
            },
            None => {
                // A stale binding id on the envelope distinguishes
                // revoked from never-linked
                if let Some(id) = &envelope.actor_binding_id {
                    if let Some(known) = stores.identity.get(id) {
                        if known.status == mu_core::BindingStatus::Revoked {
                            return Err(ErrorCode::IdentityRevoked);
                        }
                    }
                }
                Err(ErrorCode::IdentityNotLinked)
            }
        }
    }

    // -- step 5: idempotency --

    /// Claim the envelope's idempotency key for the given command id.
    /// Returns `Some(result)` to short-circuit on duplicate/conflict.
    fn claim(
        &self,
        envelope: &InboundEnvelope,
        command_id: &CommandId,
    ) -> Result<Option<CommandPipelineResult>, PipelineError> {
        let now_ms = self.clock.epoch_ms();
        let mut stores = self.stores.lock();
        match stores.idempotency.claim(
            &envelope.idempotency_key,
            &envelope.fingerprint,
            command_id,
            self.config.idempotency_ttl_ms,
            now_ms,
        )? {
            ClaimOutcome::Fresh => Ok(None),
            ClaimOutcome::Duplicate { command_id } => Ok(Some(CommandPipelineResult::Noop {
                reason: ErrorCode::DuplicateDelivery,
                command_id: Some(command_id),
            })),
            ClaimOutcome::Conflict => Ok(Some(CommandPipelineResult::Denied {
                reason: ErrorCode::IdempotencyConflict,
            })),
        }
    }

    // -- step 7: execution paths --

    async fn run_command(
        &self,
        envelope: &InboundEnvelope,
        binding: &IdentityBinding,
        command_id: CommandId,
        key: &str,
        args: Vec<String>,
        _mode: InvocationMode,
        operator_ids: Option<(String, String)>,
    ) -> Result<CommandPipelineResult, PipelineError> {
        let decision = self
            .policy
            .lock()
            .authorize(key, binding, envelope.channel);
        let rule = match decision {
            PolicyDecision::Allow(rule) => rule,
            PolicyDecision::Deny(reason) => {
                return Ok(CommandPipelineResult::Denied { reason })
            }
        };

        let now_ms = self.clock.epoch_ms();
        let mut record = CommandRecord::accepted(
            command_id.clone(),
            key,
            args,
            rule.mutating,
            envelope.correlation(Some(command_id)),
            now_ms,
        );
        record.cli_invocation_id = envelope.metadata.get("cli_invocation_id").cloned();
        record.cli_command_kind = envelope.metadata.get("cli_command_kind").cloned();
        record.run_root_id = envelope.metadata.get("run_root_id").cloned();
        if let Some((session_id, turn_id)) = operator_ids {
            record.operator_session_id = Some(session_id);
            record.operator_turn_id = Some(turn_id);
        }

        {
            let mut stores = self.stores.lock();
            stores.journal_lifecycle(&record, now_ms)?;
            stores.flush()?;
        }

        if !rule.mutating {
            return self.run_readonly(record).await;
        }

        if rule.confirmation_required {
            record.confirmation_expires_at_ms =
                Some(now_ms + self.config.confirmation_ttl_ms);
            record.transition(CommandState::AwaitingConfirmation, now_ms)?;
            let mut stores = self.stores.lock();
            stores.journal_lifecycle(&record, now_ms)?;
            stores.flush()?;
            return Ok(CommandPipelineResult::AwaitingConfirmation { record });
        }

        record.transition(CommandState::Queued, now_ms)?;
        {
            let mut stores = self.stores.lock();
            stores.journal_lifecycle(&record, now_ms)?;
            stores.flush()?;
        }
        self.run_queued(record).await
    }

    /// Readonly queries bypass the mutation gate and execute against a
    /// lock-free snapshot.
    async fn run_readonly(
        &self,
        mut record: CommandRecord,
    ) -> Result<CommandPipelineResult, PipelineError> {
        let outcome = self.executor.execute(&record).await;
        let now_ms = self.clock.epoch_ms();
        match outcome {
            ExecutionOutcome::Completed { result, .. } => {
                record.result = result;
                record.transition(CommandState::Completed, now_ms)?;
                let mut stores = self.stores.lock();
                stores.journal_lifecycle(&record, now_ms)?;
                stores.flush()?;
                Ok(CommandPipelineResult::Completed { record })
            }
            ExecutionOutcome::Failed { error_code } => {
                record.error_code = Some(error_code);
                record.transition(CommandState::Failed, now_ms)?;
                let mut stores = self.stores.lock();
                stores.journal_lifecycle(&record, now_ms)?;
                stores.flush()?;
                Ok(CommandPipelineResult::Failed { record })
            }
            ExecutionOutcome::Deferred { retry_delay_ms } => {
                record.transition(CommandState::Queued, now_ms)?;
                self.defer(record, now_ms + retry_delay_ms, None)
            }
        }
    }

    /// Execute a queued mutation: FIFO gate, rate check, executor, then
    /// terminal transition and mutating entries in one flush section.
    async fn run_queued(
        &self,
        mut record: CommandRecord,
    ) -> Result<CommandPipelineResult, PipelineError> {
        let _serial = self.gate.acquire().await;
        let now_ms = self.clock.epoch_ms();

        let rate = self.policy.lock().check_rate(
            &record.correlation.actor_id,
            record.correlation.channel,
            now_ms,
        );
        match rate {
            RateDecision::Proceed => {}
            RateDecision::Defer { retry_at_ms } => {
                return self.defer(record, retry_at_ms, Some(ErrorCode::BackpressureDeferred));
            }
            RateDecision::Fail => {
                record.transition(CommandState::InProgress, now_ms)?;
                record.error_code = Some(ErrorCode::BackpressureOverflow.as_str().to_string());
                record.transition(CommandState::Failed, now_ms)?;
                let mut stores = self.stores.lock();
                stores.journal_lifecycle(&record, now_ms)?;
                stores.flush()?;
                return Ok(CommandPipelineResult::Failed { record });
            }
        }

        record.attempt += 1;
        record.transition(CommandState::InProgress, now_ms)?;
        {
            let mut stores = self.stores.lock();
            stores.journal_lifecycle(&record, now_ms)?;
            stores.flush()?;
        }

        let outcome = self.executor.execute(&record).await;
        let now_ms = self.clock.epoch_ms();
        match outcome {
            ExecutionOutcome::Completed { result, mutations } => {
                record.result = result;
                record.transition(CommandState::Completed, now_ms)?;
                let mut stores = self.stores.lock();
                stores.journal_lifecycle(&record, now_ms)?;
                for effect in mutations {
                    stores.commands.append(&CommandEntry::Mutating {
                        ts_ms: now_ms,
                        command_id: record.command_id.clone(),
                        op: effect.op,
                        payload: effect.payload,
                        correlation: record.correlation.clone(),
                    })?;
                }
                // Terminal transition and its side effects become
                // durable together
                stores.flush()?;
                Ok(CommandPipelineResult::Completed { record })
            }
            ExecutionOutcome::Failed { error_code } => {
                record.error_code = Some(error_code);
                record.transition(CommandState::Failed, now_ms)?;
                let mut stores = self.stores.lock();
                stores.journal_lifecycle(&record, now_ms)?;
                stores.flush()?;
                Ok(CommandPipelineResult::Failed { record })
            }
            ExecutionOutcome::Deferred { retry_delay_ms } => {
                self.defer(record, now_ms + retry_delay_ms, None)
            }
        }
    }

    fn defer(
        &self,
        mut record: CommandRecord,
        retry_at_ms: u64,
        error_code: Option<ErrorCode>,
    ) -> Result<CommandPipelineResult, PipelineError> {
        let now_ms = self.clock.epoch_ms();
        record.retry_at_ms = Some(retry_at_ms);
        if let Some(code) = error_code {
            record.error_code = Some(code.as_str().to_string());
        }
        record.transition(CommandState::Deferred, now_ms)?;
        let mut stores = self.stores.lock();
        stores.journal_lifecycle(&record, now_ms)?;
        stores.flush()?;
        Ok(CommandPipelineResult::Deferred { record })
    }

    // -- confirmation ledger --

    async fn confirm(
        &self,
        envelope: &InboundEnvelope,
        binding: &IdentityBinding,
        command_id: &CommandId,
    ) -> Result<CommandPipelineResult, PipelineError> {
        let now_ms = self.clock.epoch_ms();
        let mut record = {
            let stores = self.stores.lock();
            match stores.state.get(command_id.as_str()) {
                Some(r) => r.clone(),
                None => {
                    return Ok(CommandPipelineResult::Denied {
                        reason: ErrorCode::ConfirmationNotPending,
                    })
                }
            }
        };

        if record.state != CommandState::AwaitingConfirmation {
            return Ok(CommandPipelineResult::Denied {
                reason: ErrorCode::ConfirmationNotPending,
            });
        }

        // The confirmer executes the mutation, so the original rule
        // applies to them too
        if let PolicyDecision::Deny(reason) = self.policy.lock().authorize(
            &record.command_key,
            binding,
            envelope.channel,
        ) {
            return Ok(CommandPipelineResult::Denied { reason });
        }

        if record
            .confirmation_expires_at_ms
            .is_some_and(|deadline| now_ms >= deadline)
        {
            record.transition(CommandState::Expired, now_ms)?;
            let mut stores = self.stores.lock();
            stores.journal_lifecycle(&record, now_ms)?;
            stores.flush()?;
            return Ok(CommandPipelineResult::Denied {
                reason: ErrorCode::ConfirmationNotPending,
            });
        }

        record.transition(CommandState::Queued, now_ms)?;
        {
            let mut stores = self.stores.lock();
            stores.journal_lifecycle(&record, now_ms)?;
            stores.flush()?;
        }
        self.run_queued(record).await
    }

    fn cancel(
        &self,
        envelope: &InboundEnvelope,
        binding: &IdentityBinding,
        command_id: &CommandId,
    ) -> Result<CommandPipelineResult, PipelineError> {
        let now_ms = self.clock.epoch_ms();
        let mut stores = self.stores.lock();
        let mut record = match stores.state.get(command_id.as_str()) {
            Some(r) => r.clone(),
            None => {
                return Ok(CommandPipelineResult::Denied {
                    reason: ErrorCode::ConfirmationNotPending,
                })
            }
        };

        if !matches!(
            record.state,
            CommandState::AwaitingConfirmation | CommandState::Queued
        ) {
            return Ok(CommandPipelineResult::Denied {
                reason: ErrorCode::ConfirmationNotPending,
            });
        }

        if let PolicyDecision::Deny(reason) = self.policy.lock().authorize(
            &record.command_key,
            binding,
            envelope.channel,
        ) {
            return Ok(CommandPipelineResult::Denied { reason });
        }

        record.transition(CommandState::Cancelled, now_ms)?;
        stores.journal_lifecycle(&record, now_ms)?;
        stores.flush()?;
        Ok(CommandPipelineResult::Cancelled { record })
    }

    // -- operator turns --

    async fn operator_turn(
        &self,
        envelope: &InboundEnvelope,
        binding: &IdentityBinding,
    ) -> Result<CommandPipelineResult, PipelineError> {
        if !envelope.conversational_ingress() {
            return Ok(CommandPipelineResult::Denied {
                reason: ErrorCode::IngressNotConversational,
            });
        }

        let claim_id = CommandId::new(self.ids.next());
        if let Some(early) = self.claim(envelope, &claim_id)? {
            return Ok(early);
        }

        let Some(operator) = &self.operator else {
            return Ok(CommandPipelineResult::Denied {
                reason: ErrorCode::OperatorUnavailable,
            });
        };

        let reply = operator.handle_inbound(envelope).await;
        match reply.decision {
            OperatorDecision::Response { message } => {
                Ok(CommandPipelineResult::OperatorResponse { message })
            }
            OperatorDecision::Reject { reason } => {
                tracing::debug!(reason = %reason, "operator rejected turn");
                Ok(CommandPipelineResult::Denied {
                    reason: ErrorCode::OperatorRejected,
                })
            }
            OperatorDecision::Command { text } => {
                let keys = self.policy.lock().keys();
                match parse_invocation(&text, &keys) {
                    Invocation::Command { key, args, mode } => {
                        self.run_command(
                            envelope,
                            binding,
                            claim_id,
                            &key,
                            args,
                            mode,
                            Some((reply.session_id, reply.turn_id)),
                        )
                        .await
                    }
                    _ => Ok(CommandPipelineResult::Invalid {
                        reason: ErrorCode::SchemaInvalid,
                    }),
                }
            }
        }
    }

    // -- sweeps --

    /// Expire overdue `awaiting_confirmation` records. Returns the ids
    /// expired.
    pub fn expire_confirmations(&self) -> Result<Vec<CommandId>, PipelineError> {
        let now_ms = self.clock.epoch_ms();
        let mut stores = self.stores.lock();
        let overdue: Vec<CommandRecord> = stores
            .state
            .commands()
            .filter(|r| {
                r.state == CommandState::AwaitingConfirmation
                    && r.confirmation_expires_at_ms
                        .is_some_and(|deadline| now_ms >= deadline)
            })
            .cloned()
            .collect();

        let mut expired = Vec::new();
        for mut record in overdue {
            record.transition(CommandState::Expired, now_ms)?;
            stores.journal_lifecycle(&record, now_ms)?;
            expired.push(record.command_id);
        }
        stores.flush()?;
        Ok(expired)
    }

    /// Re-queue deferred commands whose `retry_at_ms` has elapsed and
    /// run them through the mutation path.
    pub async fn requeue_deferred(&self) -> Result<Vec<CommandPipelineResult>, PipelineError> {
        let now_ms = self.clock.epoch_ms();
        let due: Vec<CommandRecord> = {
            let stores = self.stores.lock();
            stores
                .state
                .commands()
                .filter(|r| {
                    r.state == CommandState::Deferred
                        && r.retry_at_ms.is_some_and(|t| t <= now_ms)
                })
                .cloned()
                .collect()
        };

        let mut results = Vec::new();
        for mut record in due {
            record.retry_at_ms = None;
            record.transition(CommandState::Queued, now_ms)?;
            {
                let mut stores = self.stores.lock();
                stores.journal_lifecycle(&record, now_ms)?;
                stores.flush()?;
            }
            results.push(self.run_queued(record).await?);
        }
        Ok(results)
    }
}

#[async_trait]
impl<X, O, C> InboundHandler for CommandPipeline<X, O, C>
where
    X: CommandExecutor,
    O: OperatorBackend,
    C: Clock + 'static,
{
    async fn handle(
        &self,
        envelope: InboundEnvelope,
    ) -> Result<CommandPipelineResult, HandlerError> {
        CommandPipeline::handle(self, &envelope)
            .await
            .map_err(|e| HandlerError(e.to_string()))
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
