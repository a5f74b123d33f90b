// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter audit log.

use std::path::Path;

use crate::journal::{Journal, JournalError};
use mu_core::{AuditEntry, Channel};

/// Append-only audit trail of adapter activity.
pub struct AuditLog {
    journal: Journal<AuditEntry>,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        Ok(Self {
            journal: Journal::open(path)?,
        })
    }

    /// Record one adapter event.
    pub fn record(
        &mut self,
        channel: Channel,
        event: impl Into<String>,
        reason: Option<String>,
        metadata: Option<serde_json::Value>,
        now_ms: u64,
    ) -> Result<(), JournalError> {
        self.journal.append_flush(&AuditEntry::Audit {
            ts_ms: now_ms,
            channel,
            event: event.into(),
            reason,
            metadata,
        })
    }

    /// Load all entries (test and inspection helper).
    pub fn load(path: &Path) -> Result<Vec<AuditEntry>, JournalError> {
        Journal::<AuditEntry>::load(path)
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
