// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound delivery drivers, one per channel.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use mu_core::OutboundEnvelope;

/// Default per-delivery HTTP timeout.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Verdict of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered,
    /// Attempt failed; retry later. A channel may hint the delay
    /// (e.g. HTTP 429 `Retry-After`), which overrides computed backoff
    /// without resetting the attempt counter.
    Retry {
        error: String,
        retry_delay_ms: Option<u64>,
    },
}

/// Channel delivery driver.
#[async_trait]
pub trait DeliveryDriver: Send + Sync + 'static {
    async fn deliver(&self, envelope: &OutboundEnvelope) -> DeliveryResult;
}

/// Telegram Bot API driver: POSTs `sendMessage` for each envelope.
pub struct TelegramDriver {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramDriver {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_api_base("https://api.telegram.org", bot_token)
    }

    pub fn with_api_base(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            bot_token: bot_token.into(),
        }
    }
}

#[async_trait]
impl DeliveryDriver for TelegramDriver {
    async fn deliver(&self, envelope: &OutboundEnvelope) -> DeliveryResult {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = serde_json::json!({
            "chat_id": envelope.channel_conversation_id,
            "text": envelope.body,
        });

        let response = self
            .client
            .post(&url)
            .timeout(DELIVERY_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => DeliveryResult::Delivered,
            Ok(resp) => {
                // 429 carries a Retry-After hint in seconds
                let retry_delay_ms = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(|secs| secs * 1000);
                DeliveryResult::Retry {
                    error: format!("telegram api status {}", resp.status()),
                    retry_delay_ms,
                }
            }
            Err(e) => DeliveryResult::Retry {
                error: format!("telegram api error: {e}"),
                retry_delay_ms: None,
            },
        }
    }
}

/// In-process driver for terminal sessions: pushes envelopes onto an
/// unbounded channel the session front-end reads.
pub struct TerminalDriver {
    tx: mpsc::UnboundedSender<OutboundEnvelope>,
}

impl TerminalDriver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DeliveryDriver for TerminalDriver {
    async fn deliver(&self, envelope: &OutboundEnvelope) -> DeliveryResult {
        debug!(response_id = %envelope.response_id, "terminal delivery");
        match self.tx.send(envelope.clone()) {
            Ok(()) => DeliveryResult::Delivered,
            Err(_) => DeliveryResult::Retry {
                error: "terminal session closed".to_string(),
                retry_delay_ms: None,
            },
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
