// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One assembled control-plane generation: pipeline, adapters, and the
//! background tasks serving them.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::reload::{GenerationRuntime, StopError};
use mu_adapters::{AdapterSpec, OperatorBackend, TelegramAdapter, TerminalAdapter};
use mu_core::{GenerationIdentity, SystemClock, UuidIdGen};
use mu_engine::{CommandExecutor, CommandPipeline, OutboxHandle};

/// Pipeline type a daemon generation runs.
pub type DaemonPipeline<X, O> = CommandPipeline<X, O, SystemClock>;
/// Producer handle onto the shared outbox.
pub type DaemonOutbox = OutboxHandle<UuidIdGen, SystemClock>;
/// Telegram adapter wired to the generation's pipeline.
pub type DaemonTelegram<X, O> = TelegramAdapter<DaemonPipeline<X, O>, DaemonOutbox, SystemClock>;
/// Terminal adapter wired to the generation's pipeline.
pub type DaemonTerminal<X, O> = TerminalAdapter<DaemonPipeline<X, O>, SystemClock>;

/// A live generation. Dropping it does not stop its tasks; call
/// [`GenerationRuntime::stop`].
pub struct ControlPlaneRuntime<X, O>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    pub generation: GenerationIdentity,
    pub pipeline: Arc<DaemonPipeline<X, O>>,
    pub outbox: DaemonOutbox,
    pub telegram: Option<Arc<DaemonTelegram<X, O>>>,
    pub terminal: Arc<DaemonTerminal<X, O>>,
    specs: Vec<AdapterSpec>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<X, O> ControlPlaneRuntime<X, O>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generation: GenerationIdentity,
        pipeline: Arc<DaemonPipeline<X, O>>,
        outbox: DaemonOutbox,
        telegram: Option<Arc<DaemonTelegram<X, O>>>,
        terminal: Arc<DaemonTerminal<X, O>>,
        specs: Vec<AdapterSpec>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            generation,
            pipeline,
            outbox,
            telegram,
            terminal,
            specs,
            tasks: Mutex::new(tasks),
        }
    }
}

#[async_trait]
impl<X, O> GenerationRuntime for ControlPlaneRuntime<X, O>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    fn adapter_specs(&self) -> Vec<AdapterSpec> {
        self.specs.clone()
    }

    async fn stop(&self) -> Result<(), StopError> {
        // Refuse new inbounds first; in-flight handles finish before
        // their callers observe results
        self.pipeline.stop_accepting();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.abort();
        }
        Ok(())
    }
}
