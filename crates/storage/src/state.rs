// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized command state from journal replay.

use indexmap::IndexMap;
use mu_core::{CommandEntry, CommandId, CommandRecord, Correlation, MonotonicIdGen};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A `domain.mutating` entry accumulated against a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutatingRecord {
    pub ts_ms: u64,
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub correlation: Correlation,
}

/// Materialized command map built from replaying `commands.jsonl`.
///
/// # Idempotency Requirement
///
/// **All entry handlers MUST be idempotent.** Applying the same entry
/// twice must produce the same state as applying it once: lifecycle
/// entries carry full record snapshots (last write wins), and mutating
/// entries are guarded by an exact-duplicate check.
#[derive(Debug, Default, Clone)]
pub struct MaterializedCommands {
    commands: IndexMap<String, CommandRecord>,
    mutating: HashMap<String, Vec<MutatingRecord>>,
}

impl MaterializedCommands {
    /// Replay a journal in file order.
    pub fn replay(entries: &[CommandEntry]) -> Self {
        let mut state = Self::default();
        for entry in entries {
            state.apply_entry(entry);
        }
        state
    }

    /// Apply one journal entry.
    pub fn apply_entry(&mut self, entry: &CommandEntry) {
        match entry {
            CommandEntry::Lifecycle { record, .. } => {
                self.commands
                    .insert(record.command_id.as_str().to_string(), record.clone());
            }
            CommandEntry::Mutating {
                ts_ms,
                command_id,
                op,
                payload,
                correlation,
            } => {
                let rec = MutatingRecord {
                    ts_ms: *ts_ms,
                    op: op.clone(),
                    payload: payload.clone(),
                    correlation: correlation.clone(),
                };
                let entries = self
                    .mutating
                    .entry(command_id.as_str().to_string())
                    .or_default();
                // Guard against double-apply
                if !entries.contains(&rec) {
                    entries.push(rec);
                }
            }
        }
    }

    /// Get a command by ID or unique prefix (like git commit hashes).
    pub fn get(&self, id: &str) -> Option<&CommandRecord> {
        if let Some(record) = self.commands.get(id) {
            return Some(record);
        }

        let matches: Vec<_> = self
            .commands
            .iter()
            .filter(|(k, _)| k.starts_with(id))
            .collect();

        // Only return if exactly one match (unambiguous)
        if matches.len() == 1 {
            Some(matches[0].1)
        } else {
            None
        }
    }

    /// All commands in journal order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandRecord> {
        self.commands.values()
    }

    /// Non-terminal commands in journal order.
    pub fn recovery_candidates(&self) -> Vec<CommandRecord> {
        self.commands
            .values()
            .filter(|r| !r.is_terminal())
            .cloned()
            .collect()
    }

    /// Whether the journal holds any mutating entry for this command.
    pub fn has_mutating(&self, command_id: &CommandId) -> bool {
        self.mutating
            .get(command_id.as_str())
            .is_some_and(|v| !v.is_empty())
    }

    /// Mutating entries accumulated against a command.
    pub fn mutating_entries(&self, command_id: &CommandId) -> &[MutatingRecord] {
        self.mutating
            .get(command_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Highest numeric command-id suffix seen, for seeding the id
    /// generator after replay.
    pub fn max_command_seq(&self) -> u64 {
        self.commands
            .keys()
            .filter_map(|k| MonotonicIdGen::parse_seq(k))
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
