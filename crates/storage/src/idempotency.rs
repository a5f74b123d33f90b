// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency ledger: key → (fingerprint, command_id) with TTL.
//!
//! Expiry is lazy: entries past `expires_at_ms` are treated as absent.
//! `compact` prunes them from disk.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::journal::{Journal, JournalError};
use mu_core::CommandId;

/// Default claim TTL: 24 hours.
pub const DEFAULT_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyEntry {
    pub key: String,
    pub fingerprint: String,
    pub command_id: CommandId,
    pub expires_at_ms: u64,
}

/// Outcome of a claim attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// Key unseen (or expired); the claim is recorded.
    Fresh,
    /// Same key and fingerprint: a physical retry.
    Duplicate { command_id: CommandId },
    /// Same key, different fingerprint.
    Conflict,
}

/// Journal-backed idempotency ledger.
pub struct IdempotencyLedger {
    journal: Journal<IdempotencyEntry>,
    entries: HashMap<String, IdempotencyEntry>,
}

impl IdempotencyLedger {
    /// Open the ledger, folding existing claims (last claim per key wins).
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        let journal = Journal::open(path)?;
        let mut entries = HashMap::new();
        for entry in Journal::<IdempotencyEntry>::load(path)? {
            entries.insert(entry.key.clone(), entry);
        }
        Ok(Self { journal, entries })
    }

    /// Claim `key` for `command_id`.
    ///
    /// A live entry with the same fingerprint is a duplicate delivery; a
    /// live entry with a different fingerprint is a conflict. Expired
    /// entries are invisible and get re-claimed.
    pub fn claim(
        &mut self,
        key: &str,
        fingerprint: &str,
        command_id: &CommandId,
        ttl_ms: u64,
        now_ms: u64,
    ) -> Result<ClaimOutcome, JournalError> {
        if let Some(existing) = self.entries.get(key) {
            if existing.expires_at_ms > now_ms {
                if existing.fingerprint == fingerprint {
                    return Ok(ClaimOutcome::Duplicate {
                        command_id: existing.command_id.clone(),
                    });
                }
                return Ok(ClaimOutcome::Conflict);
            }
        }

        let entry = IdempotencyEntry {
            key: key.to_string(),
            fingerprint: fingerprint.to_string(),
            command_id: command_id.clone(),
            expires_at_ms: now_ms.saturating_add(ttl_ms),
        };
        self.journal.append_flush(&entry)?;
        self.entries.insert(key.to_string(), entry);
        Ok(ClaimOutcome::Fresh)
    }

    /// Look up a live entry; expired entries are invisible.
    pub fn lookup(&self, key: &str, now_ms: u64) -> Option<&IdempotencyEntry> {
        self.entries
            .get(key)
            .filter(|e| e.expires_at_ms > now_ms)
    }

    /// Prune expired entries from memory and disk.
    pub fn compact(&mut self, now_ms: u64) -> Result<usize, JournalError> {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at_ms > now_ms);
        let live: Vec<IdempotencyEntry> = self.entries.values().cloned().collect();
        self.journal.rewrite(&live)?;
        Ok(before - self.entries.len())
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
