// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::driver::{DeliveryDriver, DeliveryResult};
use crate::operator::{OperatorBackend, OperatorDecision, OperatorReply};
use crate::traits::{HandlerError, InboundHandler, OutboundSink};
use mu_core::{CommandPipelineResult, ErrorCode, InboundEnvelope, OutboundEnvelope};

/// Recorded delivery attempt.
#[derive(Debug, Clone)]
pub struct DriverCall {
    pub response_id: String,
    pub body: String,
}

struct FakeDriverState {
    calls: Vec<DriverCall>,
    /// Scripted verdicts, consumed front-to-back; empty means deliver.
    script: VecDeque<DeliveryResult>,
}

/// Fake delivery driver with scripted verdicts.
#[derive(Clone)]
pub struct FakeDriver {
    inner: Arc<Mutex<FakeDriverState>>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeDriverState {
                calls: Vec::new(),
                script: VecDeque::new(),
            })),
        }
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a verdict for the next delivery attempt.
    pub fn push_verdict(&self, verdict: DeliveryResult) {
        self.inner.lock().script.push_back(verdict);
    }

    /// Get all recorded delivery attempts.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl DeliveryDriver for FakeDriver {
    async fn deliver(&self, envelope: &OutboundEnvelope) -> DeliveryResult {
        let mut state = self.inner.lock();
        state.calls.push(DriverCall {
            response_id: envelope.response_id.clone(),
            body: envelope.body.clone(),
        });
        state.script.pop_front().unwrap_or(DeliveryResult::Delivered)
    }
}

struct FakeOperatorState {
    script: VecDeque<OperatorDecision>,
    turns: u64,
    envelopes: Vec<InboundEnvelope>,
}

/// Fake operator backend with scripted decisions.
#[derive(Clone)]
pub struct FakeOperator {
    inner: Arc<Mutex<FakeOperatorState>>,
}

impl Default for FakeOperator {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeOperatorState {
                script: VecDeque::new(),
                turns: 0,
                envelopes: Vec::new(),
            })),
        }
    }
}

impl FakeOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a decision for the next turn.
    pub fn push_decision(&self, decision: OperatorDecision) {
        self.inner.lock().script.push_back(decision);
    }

    /// Envelopes the operator has seen.
    pub fn envelopes(&self) -> Vec<InboundEnvelope> {
        self.inner.lock().envelopes.clone()
    }
}

#[async_trait]
impl OperatorBackend for FakeOperator {
    async fn handle_inbound(&self, envelope: &InboundEnvelope) -> OperatorReply {
        let mut state = self.inner.lock();
        state.turns += 1;
        state.envelopes.push(envelope.clone());
        let decision = state
            .script
            .pop_front()
            .unwrap_or(OperatorDecision::Response {
                message: "ack".to_string(),
            });
        OperatorReply {
            session_id: "op-session-1".to_string(),
            turn_id: format!("turn-{}", state.turns),
            decision,
        }
    }
}

struct FakeHandlerState {
    envelopes: Vec<InboundEnvelope>,
    script: VecDeque<CommandPipelineResult>,
}

/// Fake inbound handler for adapter tests: records envelopes and replays
/// scripted results.
#[derive(Clone)]
pub struct FakeHandler {
    inner: Arc<Mutex<FakeHandlerState>>,
}

impl Default for FakeHandler {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeHandlerState {
                envelopes: Vec::new(),
                script: VecDeque::new(),
            })),
        }
    }
}

impl FakeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: CommandPipelineResult) {
        self.inner.lock().script.push_back(result);
    }

    pub fn envelopes(&self) -> Vec<InboundEnvelope> {
        self.inner.lock().envelopes.clone()
    }
}

#[async_trait]
impl InboundHandler for FakeHandler {
    async fn handle(
        &self,
        envelope: InboundEnvelope,
    ) -> Result<CommandPipelineResult, HandlerError> {
        let mut state = self.inner.lock();
        state.envelopes.push(envelope);
        Ok(state
            .script
            .pop_front()
            .unwrap_or(CommandPipelineResult::Noop {
                reason: ErrorCode::EmptyInput,
                command_id: None,
            }))
    }
}

/// Fake outbound sink recording enqueued envelopes.
#[derive(Clone, Default)]
pub struct FakeSink {
    enqueued: Arc<Mutex<Vec<(String, OutboundEnvelope)>>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> Vec<(String, OutboundEnvelope)> {
        self.enqueued.lock().clone()
    }
}

impl OutboundSink for FakeSink {
    fn enqueue(&self, dedupe_key: &str, envelope: OutboundEnvelope) -> Result<(), HandlerError> {
        self.enqueued
            .lock()
            .push((dedupe_key.to_string(), envelope));
        Ok(())
    }
}
