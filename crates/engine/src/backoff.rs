// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with jitter for outbox retries.

use rand::Rng;

/// Capped exponential backoff. The computed delay for attempt `n` is
/// `base * 2^(n-1)` capped at `cap`, jittered into `[delay/2, delay]`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base_ms: u64,
    pub cap_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            cap_ms: 60_000,
        }
    }
}

impl Backoff {
    pub fn new(base_ms: u64, cap_ms: u64) -> Self {
        Self { base_ms, cap_ms }
    }

    /// Jittered delay for the given 1-based attempt count.
    pub fn delay_ms(&self, attempt: u32, rng: &mut impl Rng) -> u64 {
        let shift = attempt.saturating_sub(1).min(32);
        let exp = self
            .base_ms
            .checked_shl(shift)
            .unwrap_or(self.cap_ms)
            .min(self.cap_ms)
            .max(1);
        let half = exp / 2;
        half + rng.random_range(0..=exp - half)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
