// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mu control-plane daemon: runtime assembly, generation supervision,
//! hot reload, and the control surface the collaborator HTTP server
//! mounts.

mod control;
mod lifecycle;
mod reload;
mod runtime;
mod supervisor;
mod telemetry;

pub use control::{ChannelDescriptor, ControlSurface, GenerationView, ReloadResponse};
pub use lifecycle::{
    Daemon, DaemonConfig, SharedStoresFactory, StartupError, TelegramSettings,
};
pub use reload::{
    GenerationRuntime, ReloadError, ReloadOrchestrator, ReloadSummary, RuntimeFactory, StopError,
    WarmupError,
};
pub use runtime::{
    ControlPlaneRuntime, DaemonOutbox, DaemonPipeline, DaemonTelegram, DaemonTerminal,
};
pub use supervisor::{BeginReload, GenerationSupervisor, SupervisorError, SupervisorSnapshot};
pub use telemetry::{ReloadTelemetry, TelemetrySnapshot};
