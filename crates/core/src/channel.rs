// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messaging channels the control plane mediates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ErrorCode;

/// A messaging channel an inbound request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Telegram,
    Terminal,
    Editor,
}

impl Channel {
    /// Channels on which raw (non-command) text may reach the operator
    /// backend without a per-envelope override.
    pub fn is_conversational(&self) -> bool {
        matches!(self, Channel::Telegram | Channel::Terminal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Telegram => "telegram",
            Channel::Terminal => "terminal",
            Channel::Editor => "editor",
        }
    }

    /// All channels the control plane knows about.
    pub fn all() -> &'static [Channel] {
        &[Channel::Telegram, Channel::Terminal, Channel::Editor]
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telegram" => Ok(Channel::Telegram),
            "terminal" => Ok(Channel::Terminal),
            "editor" => Ok(Channel::Editor),
            _ => Err(ErrorCode::UnknownChannel),
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
