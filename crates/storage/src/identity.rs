// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity store: journaled bindings with an in-memory active map.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::journal::{Journal, JournalError};
use mu_core::{BindingId, BindingStatus, Channel, IdentityBinding, IdentityEvent};

/// Errors from identity store operations.
#[derive(Debug, Error)]
pub enum IdentityStoreError {
    #[error("unknown binding: {0}")]
    UnknownBinding(BindingId),
    #[error(transparent)]
    Journal(#[from] JournalError),
}

type Triple = (Channel, String, String);

/// Journal-backed identity store.
///
/// Invariant: at most one `active` binding per
/// `(channel, tenant, actor)` triple. Linking over an active binding
/// first unlinks the prior one with cause `superseded`.
pub struct IdentityStore {
    journal: Journal<IdentityEvent>,
    bindings: HashMap<BindingId, IdentityBinding>,
    active: HashMap<Triple, BindingId>,
}

impl IdentityStore {
    /// Open the store, folding the journal into the active map.
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        let journal = Journal::open(path)?;
        let mut store = Self {
            journal,
            bindings: HashMap::new(),
            active: HashMap::new(),
        };
        for event in Journal::<IdentityEvent>::load(path)? {
            store.apply_event(&event);
        }
        Ok(store)
    }

    /// Fold one journal event. Idempotent.
    fn apply_event(&mut self, event: &IdentityEvent) {
        match event {
            IdentityEvent::Linked { binding, .. } => {
                let triple = owned_triple(binding);
                // Supersede any prior active binding for the triple
                if let Some(prior_id) = self.active.get(&triple).cloned() {
                    if prior_id != binding.binding_id {
                        if let Some(prior) = self.bindings.get_mut(&prior_id) {
                            if prior.status == BindingStatus::Active {
                                prior.status = BindingStatus::Unlinked;
                                prior.unlink_cause = Some("superseded".to_string());
                            }
                        }
                    }
                }
                self.active.insert(triple, binding.binding_id.clone());
                self.bindings
                    .insert(binding.binding_id.clone(), binding.clone());
            }
            IdentityEvent::Unlinked {
                ts_ms,
                binding_id,
                cause,
            } => {
                if let Some(binding) = self.bindings.get_mut(binding_id) {
                    if binding.status == BindingStatus::Active {
                        binding.status = BindingStatus::Unlinked;
                        binding.unlinked_at_ms = Some(*ts_ms);
                        binding.unlink_cause = Some(cause.clone());
                    }
                    let triple = owned_triple(binding);
                    if self.active.get(&triple) == Some(binding_id) {
                        self.active.remove(&triple);
                    }
                }
            }
            IdentityEvent::Revoked {
                ts_ms,
                binding_id,
                reason,
            } => {
                if let Some(binding) = self.bindings.get_mut(binding_id) {
                    if binding.status != BindingStatus::Revoked {
                        binding.status = BindingStatus::Revoked;
                        binding.revoked_at_ms = Some(*ts_ms);
                        binding.revoke_reason = Some(reason.clone());
                    }
                    let triple = owned_triple(binding);
                    if self.active.get(&triple) == Some(binding_id) {
                        self.active.remove(&triple);
                    }
                }
            }
        }
    }

    /// Link a binding, superseding any active binding for the triple.
    pub fn link(&mut self, binding: IdentityBinding, now_ms: u64) -> Result<(), IdentityStoreError> {
        let triple = owned_triple(&binding);
        if let Some(prior_id) = self.active.get(&triple).cloned() {
            if prior_id != binding.binding_id {
                let unlink = IdentityEvent::Unlinked {
                    ts_ms: now_ms,
                    binding_id: prior_id,
                    cause: "superseded".to_string(),
                };
                self.journal.append(&unlink)?;
                self.apply_event(&unlink);
            }
        }

        let link = IdentityEvent::Linked {
            ts_ms: now_ms,
            binding,
        };
        self.journal.append(&link)?;
        self.journal.flush()?;
        self.apply_event(&link);
        Ok(())
    }

    /// Unlink a binding.
    pub fn unlink(
        &mut self,
        binding_id: &BindingId,
        cause: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), IdentityStoreError> {
        if !self.bindings.contains_key(binding_id) {
            return Err(IdentityStoreError::UnknownBinding(binding_id.clone()));
        }
        let event = IdentityEvent::Unlinked {
            ts_ms: now_ms,
            binding_id: binding_id.clone(),
            cause: cause.into(),
        };
        self.journal.append_flush(&event)?;
        self.apply_event(&event);
        Ok(())
    }

    /// Revoke a binding.
    pub fn revoke(
        &mut self,
        binding_id: &BindingId,
        reason: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), IdentityStoreError> {
        if !self.bindings.contains_key(binding_id) {
            return Err(IdentityStoreError::UnknownBinding(binding_id.clone()));
        }
        let event = IdentityEvent::Revoked {
            ts_ms: now_ms,
            binding_id: binding_id.clone(),
            reason: reason.into(),
        };
        self.journal.append_flush(&event)?;
        self.apply_event(&event);
        Ok(())
    }

    /// Resolve the active binding for an exact triple.
    pub fn resolve_active(
        &self,
        channel: Channel,
        tenant: &str,
        actor: &str,
    ) -> Option<&IdentityBinding> {
        let id = self
            .active
            .get(&(channel, tenant.to_string(), actor.to_string()))?;
        self.bindings
            .get(id)
            .filter(|b| b.status == BindingStatus::Active)
    }

    /// Get a binding by id regardless of status.
    pub fn get(&self, binding_id: &BindingId) -> Option<&IdentityBinding> {
        self.bindings.get(binding_id)
    }
}

fn owned_triple(binding: &IdentityBinding) -> Triple {
    (
        binding.channel,
        binding.channel_tenant_id.clone(),
        binding.channel_actor_id.clone(),
    )
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
