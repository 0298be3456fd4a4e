//! Sync queue and background worker
//!
//! Capture writes the outbox only; no submission ever blocks on the network.
//! `flush` drains the queue against a [`Delivery`]:
//!
//! - success: entry removed
//! - transient failure: retry count bumped, next attempt pushed out by
//!   exponential backoff (base doubles per attempt, capped)
//! - terminal failure, or retry ceiling hit: entry moved to the dead-letter
//!   table
//!
//! One flush runs at a time; a second caller gets `FlushInProgress` instead
//! of double-delivering.

use std::sync::Arc;
use std::time::Duration;

use shared::outbox::OutboxAction;
use shared::util::now_millis;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{Delivery, DeliveryError};
use crate::outbox::{Outbox, OutboxEntry};

/// What one flush pass accomplished
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Delivered and removed
    pub synced: usize,
    /// Transient failures left queued for a later attempt
    pub failed: usize,
    /// Moved to the dead-letter table this pass
    pub dead_lettered: usize,
    /// Entries still pending after the pass (including backed-off ones)
    pub remaining: u64,
}

pub struct SyncQueue {
    outbox: Outbox,
    delivery: Arc<dyn Delivery>,
    config: SyncConfig,
    flush_lock: Mutex<()>,
}

impl SyncQueue {
    pub fn new(outbox: Outbox, delivery: Arc<dyn Delivery>, config: SyncConfig) -> Self {
        Self {
            outbox,
            delivery,
            config,
            flush_lock: Mutex::new(()),
        }
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Capture an action locally; durable before this returns, delivered
    /// later by `flush`
    pub fn enqueue(&self, action: OutboxAction) -> ClientResult<OutboxEntry> {
        let entry = self.outbox.enqueue(&OutboxEntry::new(action))?;
        debug!(local_id = %entry.local_id, seq = entry.seq, kind = entry.action.kind_str(), "Action captured to outbox");
        Ok(entry)
    }

    /// Drain the queue once
    pub async fn flush(&self) -> ClientResult<FlushReport> {
        self.flush_with_cancel(&CancellationToken::new()).await
    }

    /// Drain the queue once, stopping between entries when cancelled
    pub async fn flush_with_cancel(&self, cancel: &CancellationToken) -> ClientResult<FlushReport> {
        let Ok(_guard) = self.flush_lock.try_lock() else {
            return Err(ClientError::FlushInProgress);
        };

        let mut report = FlushReport::default();
        let now = now_millis();

        for entry in self.outbox.pending()? {
            if cancel.is_cancelled() {
                break;
            }
            // Backed off: not due yet
            if entry.next_attempt_at > now {
                continue;
            }

            match self.delivery.deliver(&entry.action).await {
                Ok(()) => {
                    self.outbox.remove(&entry.local_id)?;
                    report.synced += 1;
                    debug!(local_id = %entry.local_id, "Entry delivered");
                }
                Err(DeliveryError::Terminal(reason)) => {
                    self.outbox.dead_letter(&entry.local_id, &reason)?;
                    report.dead_lettered += 1;
                    warn!(local_id = %entry.local_id, %reason, "Entry rejected, dead-lettered");
                }
                Err(DeliveryError::Transient(reason)) => {
                    let attempts = entry.retries + 1;
                    if attempts >= self.config.retry_ceiling {
                        let final_reason =
                            format!("Gave up after {attempts} attempts: {reason}");
                        self.outbox.dead_letter(&entry.local_id, &final_reason)?;
                        report.dead_lettered += 1;
                        warn!(local_id = %entry.local_id, attempts, "Retry ceiling hit, dead-lettered");
                    } else {
                        let next = now + backoff_delay(&self.config, attempts).as_millis() as i64;
                        self.outbox.record_failure(&entry.local_id, &reason, next)?;
                        report.failed += 1;
                        debug!(
                            local_id = %entry.local_id,
                            attempts,
                            next_attempt_at = next,
                            "Transient failure, backing off"
                        );
                    }
                }
            }
        }

        report.remaining = self.outbox.pending_count()?;
        Ok(report)
    }
}

/// Exponential backoff: base doubles per attempt, capped
fn backoff_delay(config: &SyncConfig, attempts: u32) -> Duration {
    let exp = attempts.saturating_sub(1).min(30);
    let delay = config.backoff_base.saturating_mul(1 << exp);
    delay.min(config.backoff_cap)
}

/// Background worker: flushes on an interval, on demand via [`Notify`],
/// and once more on shutdown
pub struct SyncWorker {
    queue: Arc<SyncQueue>,
    trigger: Arc<Notify>,
    shutdown: CancellationToken,
    interval: Duration,
}

impl SyncWorker {
    pub fn new(
        queue: Arc<SyncQueue>,
        trigger: Arc<Notify>,
        shutdown: CancellationToken,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            trigger,
            shutdown,
            interval,
        }
    }

    pub async fn run(self) {
        info!("Sync worker started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Sync worker shutting down, final flush");
                    // 已取消的 token 会让 flush 立即退出, 收尾这趟用新的
                    self.flush_once(&CancellationToken::new()).await;
                    break;
                }
                _ = ticker.tick() => {
                    self.flush_once(&self.shutdown).await;
                }
                _ = self.trigger.notified() => {
                    self.flush_once(&self.shutdown).await;
                }
            }
        }

        info!("Sync worker stopped");
    }

    async fn flush_once(&self, cancel: &CancellationToken) {
        match self.queue.flush_with_cancel(cancel).await {
            Ok(report) if report.synced + report.failed + report.dead_lettered > 0 => {
                info!(
                    synced = report.synced,
                    failed = report.failed,
                    dead_lettered = report.dead_lettered,
                    remaining = report.remaining,
                    "Flush pass complete"
                );
            }
            Ok(_) => {}
            Err(ClientError::FlushInProgress) => {}
            Err(e) => warn!(error = %e, "Flush pass failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = SyncConfig::default();
        assert_eq!(backoff_delay(&config, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(&config, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(&config, 3), Duration::from_secs(8));
        assert_eq!(backoff_delay(&config, 8), Duration::from_secs(256));
        assert_eq!(backoff_delay(&config, 9), Duration::from_secs(300));
        assert_eq!(backoff_delay(&config, 40), Duration::from_secs(300));
    }
}
