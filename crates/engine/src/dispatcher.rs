// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbox dispatcher: event-coalesced draining with per-channel
//! delivery drivers.
//!
//! Producers enqueue through [`OutboxHandle`] and wake the drain loop
//! via a capacity-1 channel: at most one extra drain queues behind the
//! one in flight. A periodic tick keeps the loop live even without
//! producer signals.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::backoff::Backoff;
use mu_adapters::{DeliveryDriver, DeliveryResult, HandlerError, OutboundSink};
use mu_core::{Channel, Clock, CommandId, IdGen, OutboundEnvelope, OutboxId, OutboxRecord, OutboxState};
use mu_storage::{EnqueueOutcome, JournalError, OutboxError, OutboxStore};

/// Default delivery attempts before dead-lettering.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default periodic wakeup for liveness.
const DRAIN_PERIOD: Duration = Duration::from_secs(5);

/// Producer-side handle: dedupe-keyed enqueue plus a dispatcher wake.
pub struct OutboxHandle<G: IdGen, C: Clock> {
    outbox: Arc<Mutex<OutboxStore<G>>>,
    wake_tx: mpsc::Sender<()>,
    clock: C,
    max_attempts: u32,
}

impl<G: IdGen, C: Clock> Clone for OutboxHandle<G, C> {
    fn clone(&self) -> Self {
        Self {
            outbox: Arc::clone(&self.outbox),
            wake_tx: self.wake_tx.clone(),
            clock: self.clock.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

impl<G: IdGen, C: Clock> OutboxHandle<G, C> {
    /// Enqueue and wake the drain loop.
    pub fn enqueue_outbound(
        &self,
        dedupe_key: &str,
        envelope: OutboundEnvelope,
    ) -> Result<EnqueueOutcome, JournalError> {
        let outcome = {
            let mut outbox = self.outbox.lock();
            outbox.enqueue(dedupe_key, envelope, self.max_attempts, self.clock.epoch_ms())?
        };
        // Non-blocking wake - if the channel is full, a drain is already
        // queued
        let _ = self.wake_tx.try_send(());
        Ok(outcome)
    }

    /// Clone a dead-lettered record back into the queue and wake.
    pub fn replay_dead_letter(
        &self,
        outbox_id: &OutboxId,
        requested_by: &CommandId,
    ) -> Result<(OutboxRecord, OutboxRecord), OutboxError> {
        let pair = {
            let mut outbox = self.outbox.lock();
            outbox.replay_dead_letter(outbox_id, requested_by, self.clock.epoch_ms())?
        };
        let _ = self.wake_tx.try_send(());
        Ok(pair)
    }

    pub fn get(&self, outbox_id: &OutboxId) -> Option<OutboxRecord> {
        self.outbox.lock().get(outbox_id).cloned()
    }
}

impl<G: IdGen + 'static, C: Clock + 'static> OutboundSink for OutboxHandle<G, C> {
    fn enqueue(&self, dedupe_key: &str, envelope: OutboundEnvelope) -> Result<(), HandlerError> {
        self.enqueue_outbound(dedupe_key, envelope)
            .map(|_| ())
            .map_err(|e| HandlerError(e.to_string()))
    }
}

/// The dispatcher drain loop.
pub struct Dispatcher<G: IdGen, C: Clock> {
    outbox: Arc<Mutex<OutboxStore<G>>>,
    drivers: HashMap<Channel, Arc<dyn DeliveryDriver>>,
    backoff: Backoff,
    clock: C,
}

impl<G: IdGen, C: Clock> Dispatcher<G, C> {
    /// Build a dispatcher and its producer handle/wake pair.
    pub fn new(
        outbox: OutboxStore<G>,
        backoff: Backoff,
        clock: C,
        max_attempts: u32,
    ) -> (Self, OutboxHandle<G, C>, mpsc::Receiver<()>) {
        let outbox = Arc::new(Mutex::new(outbox));
        let (wake_tx, wake_rx) = mpsc::channel(1);
        let handle = OutboxHandle {
            outbox: Arc::clone(&outbox),
            wake_tx,
            clock: clock.clone(),
            max_attempts,
        };
        (
            Self {
                outbox,
                drivers: HashMap::new(),
                backoff,
                clock,
            },
            handle,
            wake_rx,
        )
    }

    /// Register the delivery driver for a channel.
    pub fn register_driver(&mut self, channel: Channel, driver: Arc<dyn DeliveryDriver>) {
        self.drivers.insert(channel, driver);
    }

    /// One drain pass: deliver every due pending record. Returns the
    /// number of records processed.
    pub async fn drain_once(&self) -> Result<usize, JournalError> {
        let now_ms = self.clock.epoch_ms();
        let due = { self.outbox.lock().due_pending(now_ms) };
        let mut processed = 0;

        for mut record in due {
            // in_flight is the per-record mutex: no two concurrent
            // attempts for one record
            record.state = OutboxState::InFlight;
            record.updated_at_ms = now_ms;
            {
                self.outbox.lock().update(record.clone())?;
            }

            let verdict = match self.drivers.get(&record.envelope.channel) {
                Some(driver) => Some(driver.deliver(&record.envelope).await),
                None => None,
            };
            let now_ms = self.clock.epoch_ms();
            record.updated_at_ms = now_ms;

            match verdict {
                None => {
                    record.state = OutboxState::DeadLetter;
                    record.dead_letter_reason = Some("unsupported_channel".to_string());
                    warn!(
                        outbox_id = %record.outbox_id,
                        channel = %record.envelope.channel,
                        "no delivery driver, dead-lettering",
                    );
                }
                Some(DeliveryResult::Delivered) => {
                    record.state = OutboxState::Delivered;
                    record.last_error = None;
                }
                Some(DeliveryResult::Retry {
                    error,
                    retry_delay_ms,
                }) => {
                    record.attempt_count += 1;
                    record.last_error = Some(error);
                    if record.attempt_count >= record.max_attempts {
                        record.state = OutboxState::DeadLetter;
                        record.dead_letter_reason = Some("attempts_exhausted".to_string());
                        info!(
                            outbox_id = %record.outbox_id,
                            attempts = record.attempt_count,
                            "delivery attempts exhausted",
                        );
                    } else {
                        // Channel hints override backoff without
                        // resetting the attempt counter
                        let delay = retry_delay_ms.unwrap_or_else(|| {
                            self.backoff
                                .delay_ms(record.attempt_count, &mut rand::rng())
                        });
                        record.state = OutboxState::Pending;
                        record.next_attempt_at_ms = now_ms + delay;
                    }
                }
            }

            self.outbox.lock().update(record)?;
            processed += 1;
        }

        Ok(processed)
    }

    /// Drain until the wake channel closes. A periodic tick guarantees
    /// liveness without producer signals.
    pub async fn run(self, mut wake_rx: mpsc::Receiver<()>) {
        let mut ticker = tokio::time::interval(DRAIN_PERIOD);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                wake = wake_rx.recv() => {
                    if wake.is_none() {
                        break;
                    }
                }
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.drain_once().await {
                warn!(error = %e, "outbox drain failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
