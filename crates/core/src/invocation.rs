// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command text grammar.
//!
//! Accepted forms:
//! - `/<command>`: slash invocation, mode auto (`/mu <command>` addressing
//!   is accepted and the `mu` token dropped)
//! - `mu! <command>`: explicit mutation
//! - `mu? <command>`: explicit readonly
//! - `confirm <command_id>` / `cancel <command_id>`: reserved
//!
//! Command-key resolution is greedy longest-match over known token
//! sequences of lengths 3, 2, 1. Unknown prefixes fall back to the
//! 1-token form; default-deny happens in policy, not here.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::command::CommandId;
use crate::error::ErrorCode;

/// How the caller asked for the command to be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    Auto,
    Mutate,
    Readonly,
}

/// Classified inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Whitespace-only input.
    Noop,
    /// Structurally broken invocation (e.g. a bare prefix).
    Invalid { reason: ErrorCode },
    /// A command with its resolved key and remaining arguments.
    Command {
        key: String,
        args: Vec<String>,
        mode: InvocationMode,
    },
    /// Confirmation of a pending command.
    Confirm { command_id: CommandId },
    /// Cancellation of a pending command.
    Cancel { command_id: CommandId },
    /// Raw text destined for the operator backend.
    Conversational { text: String },
}

/// The set of command keys the policy table knows about.
///
/// Keys are whitespace-joined token prefixes, 1-3 tokens deep
/// (e.g. `issue dep add`, `issue close`, `status`).
#[derive(Debug, Clone, Default)]
pub struct CommandKeySet {
    keys: HashSet<String>,
}

impl CommandKeySet {
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Greedy longest-match resolution: try the 3-, 2-, then 1-token
    /// prefix of `tokens`; fall back to the bare first token.
    fn resolve<'a>(&self, tokens: &[&'a str]) -> (String, Vec<String>) {
        for depth in (1..=3.min(tokens.len())).rev() {
            let key = tokens[..depth].join(" ");
            if self.contains(&key) {
                let args = tokens[depth..].iter().map(|t| t.to_string()).collect();
                return (key, args);
            }
        }
        (
            tokens[0].to_string(),
            tokens[1..].iter().map(|t| t.to_string()).collect(),
        )
    }
}

/// Classify one inbound `command_text`.
pub fn parse_invocation(text: &str, keys: &CommandKeySet) -> Invocation {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Invocation::Noop;
    }

    let (mode, rest) = if let Some(rest) = trimmed.strip_prefix("mu!") {
        (Some(InvocationMode::Mutate), rest)
    } else if let Some(rest) = trimmed.strip_prefix("mu?") {
        (Some(InvocationMode::Readonly), rest)
    } else if let Some(rest) = trimmed.strip_prefix('/') {
        (Some(InvocationMode::Auto), rest)
    } else {
        (None, trimmed)
    };

    let Some(mode) = mode else {
        // Reserved words bind without a prefix too.
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if matches!(tokens.first(), Some(&"confirm") | Some(&"cancel")) {
            return parse_reserved(&tokens);
        }
        return Invocation::Conversational {
            text: trimmed.to_string(),
        };
    };

    let mut tokens: Vec<&str> = rest.split_whitespace().collect();

    // `/mu status` style addressing: drop the leading product token.
    if mode == InvocationMode::Auto && tokens.first() == Some(&"mu") {
        tokens.remove(0);
    }

    if tokens.is_empty() {
        return Invocation::Invalid {
            reason: ErrorCode::EmptyInput,
        };
    }

    match tokens[0] {
        "confirm" | "cancel" => parse_reserved(&tokens),
        _ => {
            let (key, args) = keys.resolve(&tokens);
            Invocation::Command { key, args, mode }
        }
    }
}

/// Parse `confirm <command_id>` / `cancel <command_id>`.
fn parse_reserved(tokens: &[&str]) -> Invocation {
    match (tokens.first(), tokens.get(1), tokens.len()) {
        (Some(&"confirm"), Some(id), 2) => Invocation::Confirm {
            command_id: CommandId::new(*id),
        },
        (Some(&"cancel"), Some(id), 2) => Invocation::Cancel {
            command_id: CommandId::new(*id),
        },
        _ => Invocation::Invalid {
            reason: ErrorCode::SchemaInvalid,
        },
    }
}

#[cfg(test)]
#[path = "invocation_tests.rs"]
mod tests;
