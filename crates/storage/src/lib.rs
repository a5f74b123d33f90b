// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the mu control plane.
//!
//! Every store is an append-only JSONL journal under the repository's
//! control-plane directory; live objects are the fold of the replayed
//! log. A single writer lock per repository protects all of them.

mod audit;
mod idempotency;
mod identity;
mod ingress;
mod journal;
mod outbox;
mod paths;
mod state;
mod writer_lock;

pub use audit::AuditLog;
pub use idempotency::{ClaimOutcome, IdempotencyEntry, IdempotencyLedger, DEFAULT_TTL_MS};
pub use identity::{IdentityStore, IdentityStoreError};
pub use ingress::{IngressEntry, IngressLog, IngressStatus};
pub use journal::{Journal, JournalError};
pub use outbox::{EnqueueOutcome, OutboxError, OutboxStore};
pub use paths::ControlPlanePaths;
pub use state::{MaterializedCommands, MutatingRecord};
pub use writer_lock::{WriterLock, WriterLockError, WriterLockOwner};
