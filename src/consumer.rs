use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::ClientConfig;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::pipeline::Engine;

/// Consecutive receive failures before the consumer reports unhealthy.
/// Keeps transient broker errors from flapping the readiness probe.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Backoff bounds for retrying a failed batch in place.
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Liveness state shared with the health endpoint.
pub struct ConsumerHealth {
    healthy: AtomicBool,
    consecutive_failures: AtomicU32,
}

impl ConsumerHealth {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn record_success(&self) {
        if self.consecutive_failures.swap(0, Ordering::SeqCst) > 0 {
            self.healthy.store(true, Ordering::SeqCst);
        }
    }

    fn record_failure(&self) -> u32 {
        let fails = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if fails >= MAX_CONSECUTIVE_FAILURES {
            self.healthy.store(false, Ordering::SeqCst);
        }
        fails
    }

    fn mark_stopped(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }
}

impl Default for ConsumerHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls price-update batches from the queue and drives the pipeline.
/// Commits are manual and happen only after the whole batch has been
/// evaluated, giving at-least-once delivery.
pub struct QuoteFeedReader {
    consumer: StreamConsumer,
    engine: Arc<Engine>,
    health: Arc<ConsumerHealth>,
}

impl QuoteFeedReader {
    pub fn new(config: &Config, engine: Arc<Engine>, health: Arc<ConsumerHealth>) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap)
            .set("group.id", &config.kafka_group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| AppError::Queue(e.to_string()))?;

        consumer
            .subscribe(&[config.kafka_topic.as_str()])
            .map_err(|e| AppError::Queue(e.to_string()))?;

        Ok(Self {
            consumer,
            engine,
            health,
        })
    }

    /// Blocks until the shutdown signal fires. In-flight batch work
    /// finishes before returning; an unprocessed batch is simply never
    /// committed and will redeliver.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("quote feed reader started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = self.consumer.recv() => match received {
                    Ok(message) => {
                        self.health.record_success();
                        self.process(&message, &mut shutdown).await;
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    Err(e) => {
                        let fails = self.health.record_failure();
                        warn!(consecutive = fails, "queue receive error: {} — retrying in 5s", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        info!("quote feed reader stopping");
        self.health.mark_stopped();
    }

    /// Drives one message to a terminal state: committed (processed or
    /// deliberately discarded) or left uncommitted because shutdown
    /// fired mid-retry. Retryable failures back off and retry the SAME
    /// message: group offsets are per-partition high-water marks, so
    /// committing any later message would mark this one consumed and
    /// its alerts would be dropped.
    async fn process(&self, message: &BorrowedMessage<'_>, shutdown: &mut watch::Receiver<bool>) {
        let Some(payload) = message.payload() else {
            warn!("empty message payload — discarding");
            self.commit(message);
            return;
        };

        let mut delay = INITIAL_RETRY_DELAY;
        loop {
            match self.engine.handle_price_update(payload).await {
                Ok(()) => {
                    self.commit(message);
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    warn!("non-retryable batch error — discarding message: {}", e);
                    self.commit(message);
                    return;
                }
                Err(e) => {
                    warn!("batch processing failed — retrying in {:?}: {}", delay, e);
                    tokio::select! {
                        _ = shutdown.changed() => {
                            info!("shutdown during retry — message left uncommitted for redelivery");
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = next_retry_delay(delay);
                }
            }
        }
    }

    fn commit(&self, message: &BorrowedMessage<'_>) {
        if let Err(e) = self.consumer.commit_message(message, CommitMode::Async) {
            warn!("failed to commit message: {}", e);
        }
    }
}

fn next_retry_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_flips_after_consecutive_failures() {
        let health = ConsumerHealth::new();
        assert!(health.is_healthy());

        health.record_failure();
        health.record_failure();
        assert!(health.is_healthy());

        health.record_failure();
        assert!(!health.is_healthy());

        health.record_success();
        assert!(health.is_healthy());
    }

    #[test]
    fn test_health_stopped_is_terminal_until_success() {
        let health = ConsumerHealth::new();
        health.mark_stopped();
        assert!(!health.is_healthy());
    }

    #[test]
    fn test_transient_failures_hold_the_message_in_place() {
        // A transiently failed batch is retried, never skipped:
        // committing a later message would advance the group offset
        // past the failed one and silently drop its alerts.
        assert!(AppError::Database(sea_orm::DbErr::Custom("connection reset".into())).is_retryable());
        assert!(AppError::Queue("receive timeout".into()).is_retryable());
        // Undecodable payloads are discarded, not retried forever.
        assert!(!AppError::MalformedMessage("unexpected end of input".into()).is_retryable());
    }

    #[test]
    fn test_retry_delay_doubles_up_to_cap() {
        let delay = next_retry_delay(INITIAL_RETRY_DELAY);
        assert_eq!(delay, Duration::from_secs(1));

        let mut delay = INITIAL_RETRY_DELAY;
        for _ in 0..10 {
            delay = next_retry_delay(delay);
        }
        assert_eq!(delay, MAX_RETRY_DELAY);
    }
}
