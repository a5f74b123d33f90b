// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mu-core: Core library for the mu control plane

pub mod channel;
pub mod clock;
pub mod command;
pub mod entry;
pub mod envelope;
pub mod error;
pub mod generation;
pub mod id;
pub mod identity;
pub mod invocation;
pub mod outbox;
pub mod result;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use channel::Channel;
pub use clock::{Clock, FakeClock, SystemClock};
pub use command::{CommandId, CommandRecord, CommandState, TransitionError};
pub use entry::{AuditEntry, CommandEntry, IdentityEvent};
pub use envelope::{
    Attachment, Correlation, InboundEnvelope, OutboundEnvelope, OutboundKind, ENVELOPE_VERSION,
    INGRESS_OVERRIDE_KEY, INGRESS_OVERRIDE_VALUE,
};
pub use error::ErrorCode;
pub use generation::{
    GenerationIdentity, ReloadAttempt, ReloadAttemptId, ReloadAttemptState, ReloadOutcome,
};
pub use id::{IdGen, MonotonicIdGen, SequentialIdGen, ShortId, UuidIdGen};
pub use identity::{
    terminal_binding, AssuranceTier, BindingId, BindingStatus, IdentityBinding,
    TERMINAL_BINDING_ID, WILDCARD_SCOPE,
};
pub use invocation::{parse_invocation, CommandKeySet, Invocation, InvocationMode};
pub use outbox::{OutboxId, OutboxRecord, OutboxState};
pub use result::CommandPipelineResult;
