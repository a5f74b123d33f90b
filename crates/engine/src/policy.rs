// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy engine: static command table, kill-switches, rate limiter.
//!
//! Default-deny: a command must be mapped, the binding must carry every
//! required scope, and the binding's tier must meet the rule's minimum.
//! Kill-switches gate mutations independently of scope. The inbound
//! envelope's `scope_required`/`scope_effective` hints are advisory;
//! this table is authoritative.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

use mu_core::{AssuranceTier, Channel, CommandKeySet, ErrorCode, IdentityBinding};

/// Policy entry for one command key.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRule {
    pub scopes: Vec<String>,
    pub mutating: bool,
    pub confirmation_required: bool,
    pub min_assurance_tier: AssuranceTier,
    /// Coarse category for kill-switches, e.g. `issue_write`.
    pub ops_class: String,
}

impl CommandRule {
    pub fn readonly(scope: &str, tier: AssuranceTier) -> Self {
        Self {
            scopes: vec![scope.to_string()],
            mutating: false,
            confirmation_required: false,
            min_assurance_tier: tier,
            ops_class: "read".to_string(),
        }
    }

    pub fn mutating(
        scope: &str,
        tier: AssuranceTier,
        ops_class: &str,
        confirmation_required: bool,
    ) -> Self {
        Self {
            scopes: vec![scope.to_string()],
            mutating: true,
            confirmation_required,
            min_assurance_tier: tier,
            ops_class: ops_class.to_string(),
        }
    }
}

/// What to do when a rate window overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowBehavior {
    Defer,
    Fail,
}

/// Fixed sliding-window rate limits.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Max mutation executions per `(actor, channel)` per window.
    pub actor_limit: u32,
    /// Max mutation executions per channel per window.
    pub channel_limit: u32,
    pub window_ms: u64,
    pub overflow: OverflowBehavior,
    pub defer_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            actor_limit: 30,
            channel_limit: 120,
            window_ms: 60_000,
            overflow: OverflowBehavior::Defer,
            defer_ms: 1_000,
        }
    }
}

/// Full policy configuration.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub rules: IndexMap<String, CommandRule>,
    pub mutations_disabled_global: bool,
    pub disabled_channels: HashSet<Channel>,
    pub disabled_classes: HashSet<String>,
    pub rate: RateLimitConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            mutations_disabled_global: false,
            disabled_channels: HashSet::new(),
            disabled_classes: HashSet::new(),
            rate: RateLimitConfig::default(),
        }
    }
}

/// The built-in command table.
fn default_rules() -> IndexMap<String, CommandRule> {
    use AssuranceTier::*;
    let mut rules = IndexMap::new();
    rules.insert("status".into(), CommandRule::readonly("cp.read", TierC));
    rules.insert(
        "issue list".into(),
        CommandRule::readonly("cp.issue.read", TierC),
    );
    rules.insert(
        "issue show".into(),
        CommandRule::readonly("cp.issue.read", TierC),
    );
    rules.insert(
        "issue create".into(),
        CommandRule::mutating("cp.issue.write", TierB, "issue_write", false),
    );
    rules.insert(
        "issue close".into(),
        CommandRule::mutating("cp.issue.write", TierA, "issue_write", true),
    );
    rules.insert(
        "issue dep add".into(),
        CommandRule::mutating("cp.issue.write", TierB, "issue_write", false),
    );
    rules.insert(
        "forum post".into(),
        CommandRule::mutating("cp.forum.write", TierB, "forum_write", false),
    );
    rules.insert(
        "run start".into(),
        CommandRule::mutating("cp.run.execute", TierA, "run_execute", true),
    );
    rules.insert(
        "reload".into(),
        CommandRule::mutating("cp.admin", TierA, "ops", false),
    );
    rules.insert(
        "update".into(),
        CommandRule::mutating("cp.admin", TierA, "ops", false),
    );
    rules
}

/// Authorization decision.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDecision {
    Allow(CommandRule),
    Deny(ErrorCode),
}

/// Rate-limit decision for a mutation about to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Proceed,
    Defer { retry_at_ms: u64 },
    Fail,
}

/// The policy engine: table lookups plus sliding-window state.
pub struct PolicyEngine {
    config: PolicyConfig,
    actor_windows: HashMap<(String, Channel), VecDeque<u64>>,
    channel_windows: HashMap<Channel, VecDeque<u64>>,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            actor_windows: HashMap::new(),
            channel_windows: HashMap::new(),
        }
    }

    /// The key set for invocation resolution.
    pub fn keys(&self) -> CommandKeySet {
        CommandKeySet::new(self.config.rules.keys().cloned())
    }

    pub fn rule(&self, key: &str) -> Option<&CommandRule> {
        self.config.rules.get(key)
    }

    /// Authorize one command key against a binding.
    pub fn authorize(
        &self,
        key: &str,
        binding: &IdentityBinding,
        channel: Channel,
    ) -> PolicyDecision {
        let Some(rule) = self.config.rules.get(key) else {
            return PolicyDecision::Deny(ErrorCode::UnmappedCommand);
        };

        if !rule.scopes.iter().all(|s| binding.has_scope(s)) {
            return PolicyDecision::Deny(ErrorCode::MissingScope);
        }
        if !binding.assurance_tier.meets(rule.min_assurance_tier) {
            return PolicyDecision::Deny(ErrorCode::AssuranceTierTooLow);
        }

        if rule.mutating {
            if self.config.mutations_disabled_global {
                return PolicyDecision::Deny(ErrorCode::MutationsDisabledGlobal);
            }
            if self.config.disabled_channels.contains(&channel) {
                return PolicyDecision::Deny(ErrorCode::MutationsDisabledChannel);
            }
            if self.config.disabled_classes.contains(&rule.ops_class) {
                return PolicyDecision::Deny(ErrorCode::MutationsDisabledClass);
            }
        }

        PolicyDecision::Allow(rule.clone())
    }

    /// Consume one slot in the actor and channel windows.
    pub fn check_rate(&mut self, actor: &str, channel: Channel, now_ms: u64) -> RateDecision {
        let window_ms = self.config.rate.window_ms;
        let cutoff = now_ms.saturating_sub(window_ms);

        let actor_key = (actor.to_string(), channel);
        let actor_window = self.actor_windows.entry(actor_key).or_default();
        while actor_window.front().is_some_and(|&t| t <= cutoff) {
            actor_window.pop_front();
        }
        let channel_window = self.channel_windows.entry(channel).or_default();
        while channel_window.front().is_some_and(|&t| t <= cutoff) {
            channel_window.pop_front();
        }

        let overflowed = actor_window.len() as u32 >= self.config.rate.actor_limit
            || channel_window.len() as u32 >= self.config.rate.channel_limit;
        if overflowed {
            return match self.config.rate.overflow {
                OverflowBehavior::Defer => RateDecision::Defer {
                    retry_at_ms: now_ms + self.config.rate.defer_ms,
                },
                OverflowBehavior::Fail => RateDecision::Fail,
            };
        }

        actor_window.push_back(now_ms);
        if let Some(channel_window) = self.channel_windows.get_mut(&channel) {
            channel_window.push_back(now_ms);
        }
        RateDecision::Proceed
    }

    // -- kill switches --

    pub fn set_mutations_disabled_global(&mut self, disabled: bool) {
        self.config.mutations_disabled_global = disabled;
    }

    pub fn set_channel_disabled(&mut self, channel: Channel, disabled: bool) {
        if disabled {
            self.config.disabled_channels.insert(channel);
        } else {
            self.config.disabled_channels.remove(&channel);
        }
    }

    pub fn set_class_disabled(&mut self, ops_class: &str, disabled: bool) {
        if disabled {
            self.config.disabled_classes.insert(ops_class.to_string());
        } else {
            self.config.disabled_classes.remove(ops_class);
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
