// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telegram ingress log: inbound dedupe and dead-ingress record.
//!
//! Telegram redelivers updates aggressively; the adapter short-circuits
//! exact duplicates before they reach the pipeline, and malformed
//! payloads are kept as dead lines for inspection.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::journal::{Journal, JournalError};

/// Disposition of one inbound update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngressStatus {
    Accepted,
    Duplicate,
    Dead,
}

/// One ingress line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngressEntry {
    pub ts_ms: u64,
    pub update_id: String,
    pub status: IngressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Journal-backed ingress dedupe log.
pub struct IngressLog {
    journal: Journal<IngressEntry>,
    seen: HashSet<String>,
}

impl IngressLog {
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        let journal = Journal::open(path)?;
        let mut seen = HashSet::new();
        for entry in Journal::<IngressEntry>::load(path)? {
            if entry.status == IngressStatus::Accepted {
                seen.insert(entry.update_id);
            }
        }
        Ok(Self { journal, seen })
    }

    /// Record an accepted update. Returns false (and logs a duplicate
    /// line) if the update id was already accepted.
    pub fn accept(&mut self, update_id: &str, now_ms: u64) -> Result<bool, JournalError> {
        if self.seen.contains(update_id) {
            self.journal.append_flush(&IngressEntry {
                ts_ms: now_ms,
                update_id: update_id.to_string(),
                status: IngressStatus::Duplicate,
                reason: None,
            })?;
            return Ok(false);
        }
        self.journal.append_flush(&IngressEntry {
            ts_ms: now_ms,
            update_id: update_id.to_string(),
            status: IngressStatus::Accepted,
            reason: None,
        })?;
        self.seen.insert(update_id.to_string());
        Ok(true)
    }

    /// Record a malformed update as a dead ingress line.
    pub fn dead(
        &mut self,
        update_id: &str,
        reason: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), JournalError> {
        self.journal.append_flush(&IngressEntry {
            ts_ms: now_ms,
            update_id: update_id.to_string(),
            status: IngressStatus::Dead,
            reason: Some(reason.into()),
        })
    }
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod tests;
