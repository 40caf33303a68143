//! Poll → decode → dispatch → publish → commit loop.
//!
//! One message runs to completion before the next poll. Cancellation is
//! only observed while waiting on the bus, never mid-message.

use crate::consumer::{EventSource, InboundMessage};
use crate::dispatcher::{DispatchOutcome, EventDispatcher};
use crate::metrics::PipelineMetrics;
use crate::producer::EstimateSink;
use crate::types::decode_envelope;
use anyhow::{bail, Result};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Draining => "draining",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What happened to a single inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Estimate published and inbound message committed
    Published,
    /// Event type not handled here; committed
    Ignored,
    /// Malformed or failed in the handler; committed and dropped
    Skipped,
    /// Outbound publish not confirmed; inbound message left for redelivery
    PublishFailed,
}

/// Tunables for the worker loop
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Bounded wait for each poll
    pub poll_timeout: Duration,
    /// Pause after a bus error before polling again
    pub error_backoff: Duration,
    /// Publish failures in a row before the worker stops with an error
    pub max_consecutive_publish_failures: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            error_backoff: Duration::from_secs(1),
            max_consecutive_publish_failures: 10,
        }
    }
}

/// Single-path estimation worker over an event source and an estimate sink.
pub struct EstimationWorker<S, K> {
    source: S,
    sink: K,
    dispatcher: EventDispatcher,
    metrics: Arc<PipelineMetrics>,
    settings: WorkerSettings,
    state: WorkerState,
    consecutive_publish_failures: u32,
}

impl<S, K> EstimationWorker<S, K>
where
    S: EventSource,
    K: EstimateSink,
{
    pub fn new(
        source: S,
        sink: K,
        dispatcher: EventDispatcher,
        metrics: Arc<PipelineMetrics>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            source,
            sink,
            dispatcher,
            metrics,
            settings,
            state: WorkerState::Starting,
            consecutive_publish_failures: 0,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run until `shutdown` is cancelled or the bus is persistently
    /// unreachable. The source is closed on every exit path.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        self.transition(WorkerState::Running);
        let result = self.poll_loop(&shutdown).await;

        self.transition(WorkerState::Draining);
        if let Err(e) = self.source.close().await {
            warn!(error = %e, "Failed to close subscription cleanly");
        }
        self.transition(WorkerState::Stopped);

        result
    }

    async fn poll_loop(&mut self, shutdown: &CancellationToken) -> Result<()> {
        loop {
            let polled = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Received shutdown signal, stopping consumer");
                    return Ok(());
                }
                polled = self.source.poll(self.settings.poll_timeout) => polled,
            };

            match polled {
                Ok(Some(message)) => {
                    self.process(&message).await?;
                }
                Ok(None) => {
                    debug!("No message within poll timeout");
                }
                Err(e) => {
                    warn!(error = %e, "Consumer error");
                    self.metrics.record_poll_error();
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(self.settings.error_backoff) => {}
                    }
                }
            }
        }
    }

    /// Process one inbound message end to end.
    ///
    /// Returns an error only when publishing has failed too many times in a
    /// row; every per-message failure is logged and absorbed here.
    pub async fn process(&mut self, message: &S::Message) -> Result<MessageOutcome> {
        let started = Instant::now();
        self.metrics.record_received();

        let envelope = match decode_envelope(message.payload()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, size_bytes = message.payload().len(), "Dropping undecodable message");
                self.metrics.record_skipped();
                commit(message).await;
                return Ok(MessageOutcome::Skipped);
            }
        };

        let outbound = match self.dispatcher.dispatch(&envelope) {
            DispatchOutcome::Handled(outbound) => outbound,
            DispatchOutcome::Ignored => {
                self.metrics.record_ignored();
                commit(message).await;
                return Ok(MessageOutcome::Ignored);
            }
            DispatchOutcome::Failed(_) => {
                self.metrics.record_skipped();
                commit(message).await;
                return Ok(MessageOutcome::Skipped);
            }
        };

        match self.sink.publish(&outbound).await {
            Ok(()) => {
                self.consecutive_publish_failures = 0;
                commit(message).await;

                let probability = outbound
                    .internal_estimate_generated()
                    .map(|e| e.raw_recovery_probability)
                    .unwrap_or_default();
                self.metrics.record_published(started.elapsed(), probability);
                info!(
                    inbound_event_id = %envelope.event_id,
                    event_id = %outbound.event_id,
                    probability = format!("{:.4}", probability),
                    processing_time_us = started.elapsed().as_micros(),
                    "Published ML estimate"
                );
                Ok(MessageOutcome::Published)
            }
            Err(e) => {
                self.consecutive_publish_failures += 1;
                self.metrics.record_publish_failure();
                error!(
                    inbound_event_id = %envelope.event_id,
                    event_id = %outbound.event_id,
                    consecutive_failures = self.consecutive_publish_failures,
                    error = %e,
                    "Failed to publish estimate"
                );

                if let Err(e) = message.reject().await {
                    warn!(error = %e, "Failed to request redelivery");
                }

                if self.consecutive_publish_failures >= self.settings.max_consecutive_publish_failures {
                    bail!(
                        "Giving up after {} consecutive publish failures",
                        self.consecutive_publish_failures
                    );
                }
                Ok(MessageOutcome::PublishFailed)
            }
        }
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(from = %self.state, to = %next, "Worker state change");
        self.state = next;
    }
}

async fn commit<M: InboundMessage>(message: &M) {
    if let Err(e) = message.commit().await {
        warn!(error = %e, "Failed to commit message");
    }
}
