// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control surface handlers.
//!
//! The HTTP server framing is a collaborator; these handlers return the
//! serializable bodies it mounts under `/api/control-plane/*`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::reload::{ReloadError, ReloadOrchestrator, RuntimeFactory};
use crate::reload::GenerationRuntime;
use mu_core::{Channel, Clock, ReloadAttempt, ReloadOutcome};

/// Generation block of a reload/rollback response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationView {
    pub to_generation: String,
    pub active_generation: String,
    pub outcome: ReloadOutcome,
}

/// Capability descriptor for one configured channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDescriptor {
    pub channel: Channel,
    pub route: &'static str,
    pub verification: &'static str,
    pub ack_format: &'static str,
    pub deferred_delivery: bool,
    pub conversational: bool,
}

/// Body of `POST /api/control-plane/reload` and `/rollback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReloadResponse {
    pub generation: GenerationView,
    pub attempt: ReloadAttempt,
    pub coalesced: bool,
    pub adapters: Vec<ChannelDescriptor>,
    /// HTTP status the collaborator should answer with.
    pub status: u16,
}

/// The control surface over an orchestrator.
pub struct ControlSurface<F: RuntimeFactory, C: Clock> {
    orchestrator: Arc<ReloadOrchestrator<F, C>>,
}

impl<F: RuntimeFactory, C: Clock> ControlSurface<F, C> {
    pub fn new(orchestrator: Arc<ReloadOrchestrator<F, C>>) -> Self {
        Self { orchestrator }
    }

    fn adapters(&self) -> Vec<ChannelDescriptor> {
        self.orchestrator
            .active_runtime()
            .adapter_specs()
            .into_iter()
            .map(|spec| ChannelDescriptor {
                channel: spec.channel,
                route: spec.route,
                verification: spec.verification,
                ack_format: spec.ack_format,
                deferred_delivery: spec.deferred_delivery,
                conversational: spec.channel.is_conversational(),
            })
            .collect()
    }

    /// `POST /api/control-plane/reload`
    pub async fn reload(&self, reason: &str) -> Result<ReloadResponse, ReloadError> {
        let summary = self.orchestrator.reload(reason).await?;
        let status = match summary.outcome {
            ReloadOutcome::Success => 200,
            ReloadOutcome::Failure => 500,
        };
        Ok(ReloadResponse {
            generation: GenerationView {
                to_generation: summary.attempt.to_generation.generation_id.clone(),
                active_generation: summary.active_generation.generation_id.clone(),
                outcome: summary.outcome,
            },
            attempt: summary.attempt,
            coalesced: summary.coalesced,
            adapters: self.adapters(),
            status,
        })
    }

    /// `POST /api/control-plane/rollback`
    pub async fn rollback(&self) -> Result<ReloadResponse, ReloadError> {
        let summary = self.orchestrator.force_rollback().await?;
        Ok(ReloadResponse {
            generation: GenerationView {
                to_generation: summary.attempt.to_generation.generation_id.clone(),
                active_generation: summary.active_generation.generation_id.clone(),
                outcome: summary.outcome,
            },
            attempt: summary.attempt,
            coalesced: summary.coalesced,
            adapters: self.adapters(),
            status: 200,
        })
    }

    /// `GET /api/control-plane/channels`
    pub fn channels(&self) -> Vec<ChannelDescriptor> {
        self.adapters()
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
