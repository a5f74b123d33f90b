// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation serialization.
//!
//! All mutating commands across the process pass through one gate that
//! admits them strictly in submission order; readonly queries bypass it.
//! `tokio::sync::Mutex` queues waiters FIFO, which is exactly the
//! cooperative tail-chain contract.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Process-wide FIFO gate for mutating commands.
#[derive(Clone, Default)]
pub struct MutationGate {
    inner: Arc<Mutex<()>>,
}

impl MutationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the tail of the chain. The returned guard holds the
    /// gate; drop it to admit the next submission.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
