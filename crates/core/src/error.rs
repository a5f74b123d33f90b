// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error codes carried across the pipeline boundary.
//!
//! Failures are values: every pipeline, policy, and dispatcher decision
//! carries one of these codes rather than throwing. The wire form is the
//! snake_case string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error code strings surfaced in records, acks, and journals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // -- validation --
    EmptyInput,
    SchemaInvalid,
    UnknownChannel,

    // -- identity --
    IdentityNotLinked,
    IdentityRevoked,

    // -- policy --
    UnmappedCommand,
    MissingScope,
    AssuranceTierTooLow,
    MutationsDisabledGlobal,
    MutationsDisabledChannel,
    MutationsDisabledClass,

    // -- idempotency --
    IdempotencyConflict,
    DuplicateDelivery,

    // -- backpressure --
    BackpressureDeferred,
    BackpressureOverflow,

    // -- execution --
    IngressNotConversational,
    OperatorUnavailable,
    OperatorRejected,
    ConfirmationNotPending,

    // -- infrastructure --
    WriterLockBusy,
    JournalCorrupt,
    DlqNotFound,
    DlqNotDeadLetter,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyInput => "empty_input",
            ErrorCode::SchemaInvalid => "schema_invalid",
            ErrorCode::UnknownChannel => "unknown_channel",
            ErrorCode::IdentityNotLinked => "identity_not_linked",
            ErrorCode::IdentityRevoked => "identity_revoked",
            ErrorCode::UnmappedCommand => "unmapped_command",
            ErrorCode::MissingScope => "missing_scope",
            ErrorCode::AssuranceTierTooLow => "assurance_tier_too_low",
            ErrorCode::MutationsDisabledGlobal => "mutations_disabled_global",
            ErrorCode::MutationsDisabledChannel => "mutations_disabled_channel",
            ErrorCode::MutationsDisabledClass => "mutations_disabled_class",
            ErrorCode::IdempotencyConflict => "idempotency_conflict",
            ErrorCode::DuplicateDelivery => "duplicate_delivery",
            ErrorCode::BackpressureDeferred => "backpressure_deferred",
            ErrorCode::BackpressureOverflow => "backpressure_overflow",
            ErrorCode::IngressNotConversational => "ingress_not_conversational",
            ErrorCode::OperatorUnavailable => "operator_unavailable",
            ErrorCode::OperatorRejected => "operator_rejected",
            ErrorCode::ConfirmationNotPending => "confirmation_not_pending",
            ErrorCode::WriterLockBusy => "writer_lock_busy",
            ErrorCode::JournalCorrupt => "journal_corrupt",
            ErrorCode::DlqNotFound => "dlq_not_found",
            ErrorCode::DlqNotDeadLetter => "dlq_not_dead_letter",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
