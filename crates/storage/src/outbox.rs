// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable outbox store with dedupe-keyed enqueue.
//!
//! State changes are appended as full record snapshots; the live map is
//! the last-write-wins fold of the journal. Only the dispatcher mutates
//! records after enqueue, under the repository's single writer lock.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::journal::{Journal, JournalError};
use mu_core::{CommandId, IdGen, OutboundEnvelope, OutboxId, OutboxRecord, OutboxState};

/// Errors from outbox operations.
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("outbox record not found: {0}")]
    DlqNotFound(OutboxId),
    #[error("outbox record is not dead-lettered: {0}")]
    DlqNotDeadLetter(OutboxId),
    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Outcome of an enqueue attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Enqueued(OutboxRecord),
    /// The dedupe key already maps to a record; that record is returned
    /// regardless of envelope differences.
    Duplicate(OutboxRecord),
}

impl EnqueueOutcome {
    pub fn record(&self) -> &OutboxRecord {
        match self {
            EnqueueOutcome::Enqueued(r) | EnqueueOutcome::Duplicate(r) => r,
        }
    }
}

/// Journal-backed outbox.
pub struct OutboxStore<G: IdGen> {
    journal: Journal<OutboxRecord>,
    ids: G,
    records: IndexMap<String, OutboxRecord>,
    /// dedupe_key → first outbox id ever assigned for that key.
    by_dedupe: HashMap<String, OutboxId>,
}

impl<G: IdGen> OutboxStore<G> {
    /// Open the store, folding the journal (last snapshot per record
    /// wins; the dedupe index keeps its first assignment).
    pub fn open(path: &Path, ids: G) -> Result<Self, JournalError> {
        let journal = Journal::open(path)?;
        let mut records: IndexMap<String, OutboxRecord> = IndexMap::new();
        let mut by_dedupe: HashMap<String, OutboxId> = HashMap::new();
        for record in Journal::<OutboxRecord>::load(path)? {
            by_dedupe
                .entry(record.dedupe_key.clone())
                .or_insert_with(|| record.outbox_id.clone());
            records.insert(record.outbox_id.as_str().to_string(), record);
        }
        Ok(Self {
            journal,
            ids,
            records,
            by_dedupe,
        })
    }

    /// Enqueue an outbound envelope under a dedupe key.
    pub fn enqueue(
        &mut self,
        dedupe_key: &str,
        envelope: OutboundEnvelope,
        max_attempts: u32,
        now_ms: u64,
    ) -> Result<EnqueueOutcome, JournalError> {
        if let Some(existing_id) = self.by_dedupe.get(dedupe_key) {
            if let Some(existing) = self.records.get(existing_id.as_str()) {
                return Ok(EnqueueOutcome::Duplicate(existing.clone()));
            }
        }

        let record = OutboxRecord::pending(
            OutboxId::new(self.ids.next()),
            dedupe_key,
            envelope,
            max_attempts,
            now_ms,
        );
        self.journal.append_flush(&record)?;
        self.by_dedupe
            .insert(dedupe_key.to_string(), record.outbox_id.clone());
        self.records
            .insert(record.outbox_id.as_str().to_string(), record.clone());
        Ok(EnqueueOutcome::Enqueued(record))
    }

    /// Persist an updated record snapshot.
    pub fn update(&mut self, record: OutboxRecord) -> Result<(), JournalError> {
        self.journal.append_flush(&record)?;
        self.records
            .insert(record.outbox_id.as_str().to_string(), record);
        Ok(())
    }

    pub fn get(&self, outbox_id: &OutboxId) -> Option<&OutboxRecord> {
        self.records.get(outbox_id.as_str())
    }

    /// Pending records due by `now_ms`, oldest first.
    pub fn due_pending(&self, now_ms: u64) -> Vec<OutboxRecord> {
        let mut due: Vec<OutboxRecord> = self
            .records
            .values()
            .filter(|r| r.state == OutboxState::Pending && r.next_attempt_at_ms <= now_ms)
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.outbox_id.as_str().cmp(b.outbox_id.as_str()))
        });
        due
    }

    /// Clone a dead-lettered record back into the queue.
    ///
    /// The replay gets a fresh outbox id and a cleared attempt counter;
    /// the envelope and its `correlation.command_id` are preserved.
    pub fn replay_dead_letter(
        &mut self,
        outbox_id: &OutboxId,
        requested_by: &CommandId,
        now_ms: u64,
    ) -> Result<(OutboxRecord, OutboxRecord), OutboxError> {
        let original = self
            .records
            .get(outbox_id.as_str())
            .cloned()
            .ok_or_else(|| OutboxError::DlqNotFound(outbox_id.clone()))?;
        if original.state != OutboxState::DeadLetter {
            return Err(OutboxError::DlqNotDeadLetter(outbox_id.clone()));
        }

        let mut replay = OutboxRecord::pending(
            OutboxId::new(self.ids.next()),
            original.dedupe_key.clone(),
            original.envelope.clone(),
            original.max_attempts,
            now_ms,
        );
        replay.replay_of_outbox_id = Some(original.outbox_id.clone());
        replay.replay_requested_by_command_id = Some(requested_by.clone());

        self.journal.append_flush(&replay)?;
        self.records
            .insert(replay.outbox_id.as_str().to_string(), replay.clone());
        Ok((original, replay))
    }

    /// All records in journal order.
    pub fn records(&self) -> impl Iterator<Item = &OutboxRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
