// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity bindings: channel actors linked to operator identities.

use serde::{Deserialize, Serialize};

use crate::channel::Channel;

crate::define_id! {
    /// Unique identifier for an identity binding.
    pub struct BindingId;
}

/// Scope string that satisfies every scope requirement.
pub const WILDCARD_SCOPE: &str = "*";

/// Reserved binding id for in-process terminal sessions.
pub const TERMINAL_BINDING_ID: &str = "terminal";

/// Assurance rank of an identity binding. Gates mutating commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssuranceTier {
    TierA,
    TierB,
    TierC,
}

impl AssuranceTier {
    /// Numeric rank; higher means stronger assurance.
    fn rank(&self) -> u8 {
        match self {
            AssuranceTier::TierA => 3,
            AssuranceTier::TierB => 2,
            AssuranceTier::TierC => 1,
        }
    }

    /// Whether this tier satisfies a required minimum tier.
    pub fn meets(&self, min: AssuranceTier) -> bool {
        self.rank() >= min.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssuranceTier::TierA => "tier_a",
            AssuranceTier::TierB => "tier_b",
            AssuranceTier::TierC => "tier_c",
        }
    }
}

/// Lifecycle status of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingStatus {
    Active,
    Unlinked,
    Revoked,
}

/// Active association of a channel actor to an operator identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityBinding {
    pub binding_id: BindingId,
    pub operator_id: String,
    pub channel: Channel,
    pub channel_tenant_id: String,
    pub channel_actor_id: String,
    pub assurance_tier: AssuranceTier,
    pub scopes: Vec<String>,
    pub status: BindingStatus,
    pub linked_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlinked_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlink_cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoke_reason: Option<String>,
}

impl IdentityBinding {
    /// Whether this binding carries the given scope (wildcard matches all).
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope || s == WILDCARD_SCOPE)
    }

    /// Exact triple this binding is keyed by.
    pub fn triple(&self) -> (Channel, &str, &str) {
        (
            self.channel,
            self.channel_tenant_id.as_str(),
            self.channel_actor_id.as_str(),
        )
    }
}

/// The reserved binding for in-process terminal sessions.
///
/// Terminal requests never pass channel verification, so the binding is
/// synthesized rather than journaled. It carries the wildcard scope and
/// the strongest tier.
pub fn terminal_binding() -> IdentityBinding {
    IdentityBinding {
        binding_id: BindingId::new(TERMINAL_BINDING_ID),
        operator_id: "local".to_string(),
        channel: Channel::Terminal,
        channel_tenant_id: "local".to_string(),
        channel_actor_id: "terminal".to_string(),
        assurance_tier: AssuranceTier::TierA,
        scopes: vec![WILDCARD_SCOPE.to_string()],
        status: BindingStatus::Active,
        linked_at_ms: 0,
        unlinked_at_ms: None,
        unlink_cause: None,
        revoked_at_ms: None,
        revoke_reason: None,
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
