// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, generation assembly, shutdown.
//!
//! Startup order: resolve paths, take the writer lock, replay the
//! command journal, start the dispatcher, assemble generation 0.
//! Shutdown order: stop the pipeline, drain background tasks, stop the
//! dispatcher, release the writer lock.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::control::ControlSurface;
use crate::reload::{GenerationRuntime, ReloadOrchestrator, RuntimeFactory, WarmupError};
use crate::runtime::{ControlPlaneRuntime, DaemonOutbox, DaemonPipeline};
use crate::supervisor::GenerationSupervisor;
use crate::telemetry::ReloadTelemetry;
use mu_adapters::{
    ChannelAdapter, OperatorBackend, TelegramAdapter, TelegramConfig, TelegramDriver,
    TerminalAdapter, TerminalDriver,
};
use mu_core::{
    Clock, GenerationIdentity, IdGen, OutboundEnvelope, SystemClock, UuidIdGen,
};
use mu_engine::{
    replay_startup, Backoff, CommandExecutor, CommandPipeline, Dispatcher, PipelineConfig,
    PipelineError, PipelineStores, PolicyConfig, PolicyEngine, ReplayReport,
    DEFAULT_MAX_ATTEMPTS,
};
use mu_storage::{
    AuditLog, ControlPlanePaths, IngressLog, JournalError, OutboxStore, WriterLock,
    WriterLockError,
};

/// Telegram channel settings (webhook secret in, bot token out).
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub secret_token: String,
    pub tenant_id: String,
    pub bot_token: String,
}

/// Daemon configuration. Config *files* are a collaborator concern;
/// this is the assembled value.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub repo_root: PathBuf,
    pub supervisor_name: String,
    /// Writer-lock owner id; defaults to `mud-<uuid>`.
    pub owner_id: Option<String>,
    pub policy: PolicyConfig,
    pub pipeline: PipelineConfig,
    pub telegram: Option<TelegramSettings>,
    pub max_delivery_attempts: u32,
    pub sweep_interval: Duration,
}

impl DaemonConfig {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            supervisor_name: "mu".to_string(),
            owner_id: None,
            policy: PolicyConfig::default(),
            pipeline: PipelineConfig::default(),
            telegram: None,
            max_delivery_attempts: DEFAULT_MAX_ATTEMPTS,
            sweep_interval: Duration::from_secs(1),
        }
    }
}

/// Errors during daemon startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    WriterLock(#[from] WriterLockError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Replay(#[from] PipelineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Factory that assembles generations over the shared journaled stores.
///
/// The outbox and its dispatcher are generation-independent (the store
/// is durable); each generation gets a fresh pipeline, adapters, and
/// sweeper.
pub struct SharedStoresFactory<X, O>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    config: DaemonConfig,
    stores: Arc<Mutex<PipelineStores>>,
    executor: Arc<X>,
    operator: Option<Arc<O>>,
    outbox: DaemonOutbox,
    audit: Arc<Mutex<AuditLog>>,
    ingress: Arc<Mutex<IngressLog>>,
}

impl<X, O> SharedStoresFactory<X, O>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    fn assemble(
        &self,
        generation: &GenerationIdentity,
    ) -> Result<Arc<ControlPlaneRuntime<X, O>>, JournalError> {
        let pipeline: Arc<DaemonPipeline<X, O>> = Arc::new(CommandPipeline::new(
            Arc::clone(&self.stores),
            Arc::new(Mutex::new(PolicyEngine::new(self.config.policy.clone()))),
            Arc::clone(&self.executor),
            self.operator.clone(),
            SystemClock,
            self.config.pipeline.clone(),
        ));

        let terminal = Arc::new(TerminalAdapter::new(
            Arc::clone(&pipeline),
            Arc::clone(&self.audit),
            SystemClock,
        ));

        let telegram = match &self.config.telegram {
            Some(settings) => Some(Arc::new(TelegramAdapter::new(
                TelegramConfig {
                    secret_token: settings.secret_token.clone(),
                    tenant_id: settings.tenant_id.clone(),
                    repo_root: self.config.repo_root.clone(),
                },
                Arc::clone(&pipeline),
                Arc::new(self.outbox.clone()),
                Arc::clone(&self.audit),
                Arc::clone(&self.ingress),
                SystemClock,
            ))),
            None => None,
        };

        let mut specs = vec![terminal.spec()];
        if let Some(telegram) = &telegram {
            specs.push(telegram.spec());
        }

        let sweeper = spawn_sweeper(Arc::clone(&pipeline), self.config.sweep_interval);

        Ok(Arc::new(ControlPlaneRuntime::new(
            generation.clone(),
            pipeline,
            self.outbox.clone(),
            telegram,
            terminal,
            specs,
            vec![sweeper],
        )))
    }
}

#[async_trait]
impl<X, O> RuntimeFactory for SharedStoresFactory<X, O>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    type Runtime = ControlPlaneRuntime<X, O>;

    async fn build(
        &self,
        generation: &GenerationIdentity,
    ) -> Result<Arc<Self::Runtime>, WarmupError> {
        info!(generation = %generation.generation_id, "warming up runtime");
        self.assemble(generation)
            .map_err(|e| WarmupError(e.to_string()))
    }
}

/// Periodically expire overdue confirmations and re-queue elapsed
/// deferrals.
fn spawn_sweeper<X, O>(
    pipeline: Arc<DaemonPipeline<X, O>>,
    interval: Duration,
) -> JoinHandle<()>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match pipeline.expire_confirmations() {
                Ok(expired) if !expired.is_empty() => {
                    info!(count = expired.len(), "expired confirmations");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "confirmation sweep failed"),
            }
            if let Err(e) = pipeline.requeue_deferred().await {
                warn!(error = %e, "deferred re-queue failed");
            }
        }
    })
}

/// A running daemon.
pub struct Daemon<X, O>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    pub paths: ControlPlanePaths,
    pub supervisor: Arc<GenerationSupervisor>,
    pub telemetry: Arc<ReloadTelemetry>,
    pub replay: ReplayReport,
    orchestrator: Arc<ReloadOrchestrator<SharedStoresFactory<X, O>, SystemClock>>,
    /// Outbound envelopes for in-process terminal sessions.
    pub terminal_outbound: mpsc::UnboundedReceiver<OutboundEnvelope>,
    lock: Option<WriterLock>,
    dispatcher_task: Option<JoinHandle<()>>,
}

impl<X, O> Daemon<X, O>
where
    X: CommandExecutor,
    O: OperatorBackend,
{
    /// Start the daemon for one repository.
    pub async fn start(
        config: DaemonConfig,
        executor: Arc<X>,
        operator: Option<Arc<O>>,
    ) -> Result<Self, StartupError> {
        let clock = SystemClock;
        let paths = ControlPlanePaths::resolve(&config.repo_root);
        paths.ensure()?;

        let owner_id = config
            .owner_id
            .clone()
            .unwrap_or_else(|| format!("mud-{}", UuidIdGen.next()));
        let lock = WriterLock::acquire(
            &paths.writer_lock,
            owner_id,
            &config.repo_root,
            clock.epoch_ms(),
        )?;

        // Replay before accepting any traffic
        let stores = Arc::new(Mutex::new(PipelineStores::open(&paths)?));
        let replay = replay_startup(&stores, executor.as_ref(), clock.epoch_ms()).await?;
        info!(
            reconciled = replay.reconciled.len(),
            executed = replay.executed.len(),
            expired = replay.expired.len(),
            "startup replay complete",
        );

        // Outbox + dispatcher (generation-independent)
        let outbox_store = OutboxStore::open(&paths.outbox, UuidIdGen)?;
        let (mut dispatcher, outbox, wake_rx) = Dispatcher::new(
            outbox_store,
            Backoff::default(),
            clock.clone(),
            config.max_delivery_attempts,
        );
        let (terminal_driver, terminal_outbound) = TerminalDriver::new();
        dispatcher.register_driver(mu_core::Channel::Terminal, Arc::new(terminal_driver));
        if let Some(settings) = &config.telegram {
            dispatcher.register_driver(
                mu_core::Channel::Telegram,
                Arc::new(TelegramDriver::new(settings.bot_token.clone())),
            );
        }
        let dispatcher_task = tokio::spawn(dispatcher.run(wake_rx));

        let audit = Arc::new(Mutex::new(AuditLog::open(&paths.adapter_audit)?));
        let ingress = Arc::new(Mutex::new(IngressLog::open(&paths.telegram_ingress)?));

        let supervisor = Arc::new(GenerationSupervisor::new(&config.supervisor_name));
        let telemetry = Arc::new(ReloadTelemetry::new());

        let factory = SharedStoresFactory {
            config,
            stores,
            executor,
            operator,
            outbox,
            audit,
            ingress,
        };
        let initial = factory
            .assemble(&supervisor.active_generation())
            .map_err(StartupError::Journal)?;

        let orchestrator = Arc::new(ReloadOrchestrator::new(
            Arc::clone(&supervisor),
            Arc::clone(&telemetry),
            factory,
            initial,
            clock,
        ));

        Ok(Self {
            paths,
            supervisor,
            telemetry,
            replay,
            orchestrator,
            terminal_outbound,
            lock: Some(lock),
            dispatcher_task: Some(dispatcher_task),
        })
    }

    /// The currently active generation runtime.
    pub fn runtime(&self) -> Arc<ControlPlaneRuntime<X, O>> {
        self.orchestrator.active_runtime()
    }

    /// The control surface for the collaborator HTTP server.
    pub fn control(&self) -> ControlSurface<SharedStoresFactory<X, O>, SystemClock> {
        ControlSurface::new(Arc::clone(&self.orchestrator))
    }

    /// Graceful shutdown: stop the pipeline, the dispatcher, and
    /// release the writer lock.
    pub async fn shutdown(mut self) -> std::io::Result<()> {
        let runtime = self.orchestrator.active_runtime();
        if let Err(e) = runtime.stop().await {
            warn!(error = %e, "runtime stop reported failure during shutdown");
        }
        if let Some(task) = self.dispatcher_task.take() {
            task.abort();
        }
        if let Some(lock) = self.lock.take() {
            lock.release()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
