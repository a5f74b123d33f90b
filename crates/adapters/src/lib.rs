// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Channel adapters for the mu control plane.
//!
//! Each adapter is a thin translator between a channel's wire format and
//! the normalized envelope: verify the request, build an
//! `InboundEnvelope`, hand it to the pipeline, map the result into the
//! channel's ack format, enqueue outbound replies, and append an audit
//! entry. Adapters never touch business stores directly.

mod driver;
mod operator;
mod telegram;
mod terminal;
mod traits;
mod verify;

pub use driver::{DeliveryDriver, DeliveryResult, TelegramDriver, TerminalDriver};
pub use operator::{OperatorBackend, OperatorDecision, OperatorReply};
pub use telegram::{TelegramAdapter, TelegramConfig};
pub use terminal::{TerminalAdapter, TerminalRequest};
pub use traits::{
    AdapterAck, AdapterError, AdapterRequest, AdapterSpec, ChannelAdapter, HandlerError,
    InboundHandler, OutboundSink,
};
pub use verify::{
    content_fingerprint, sign_hmac_sha256, verify_hmac_sha256, verify_shared_secret, VerifyError,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DriverCall, FakeDriver, FakeHandler, FakeOperator, FakeSink};
