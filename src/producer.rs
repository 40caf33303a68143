//! JetStream producer for outbound estimate envelopes

use crate::types::{encode_envelope, EventEnvelope};
use anyhow::{anyhow, Context, Result};
use async_nats::jetstream;
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Destination for outbound envelopes.
///
/// `publish` returns only once the bus has confirmed the message, so the
/// caller may commit the inbound message that produced it.
#[async_trait]
pub trait EstimateSink: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()>;
}

#[async_trait]
impl<T: EstimateSink + ?Sized> EstimateSink for Arc<T> {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()> {
        (**self).publish(envelope).await
    }
}

/// Publishes envelopes to JetStream and waits for the publish ack.
#[derive(Clone)]
pub struct EstimateProducer {
    jetstream: jetstream::Context,
    subject: String,
    ack_timeout: Duration,
}

impl EstimateProducer {
    pub fn new(jetstream: jetstream::Context, subject: &str, ack_timeout: Duration) -> Self {
        Self {
            jetstream,
            subject: subject.to_string(),
            ack_timeout,
        }
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[async_trait]
impl EstimateSink for EstimateProducer {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload = Bytes::from(encode_envelope(envelope));

        // JetStream drops a second publish with the same id inside its
        // duplicate window.
        let mut headers = HeaderMap::new();
        headers.insert(async_nats::header::NATS_MESSAGE_ID, envelope.event_id.as_str());

        let confirmation = within(self.ack_timeout, async {
            let ack = self
                .jetstream
                .publish_with_headers(self.subject.clone(), headers, payload)
                .await
                .context("Failed to publish message to JetStream")?;
            ack.await.context("Failed to receive JetStream acknowledgment")
        })
        .await?;

        debug!(
            event_id = %envelope.event_id,
            stream = %confirmation.stream,
            sequence = confirmation.sequence,
            duplicate = confirmation.duplicate,
            "Published estimate"
        );

        Ok(())
    }
}

/// Bound a whole publish, client-side enqueue included, by `limit`.
async fn within<T, F>(limit: Duration, publish: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, publish)
        .await
        .map_err(|_| anyhow!("Timed out after {:?} waiting for publish ack", limit))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stalled_enqueue_times_out() {
        let stalled = async {
            std::future::pending::<()>().await;
            Ok(())
        };

        let err = within(Duration::from_millis(20), stalled).await.unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_publish_error_passes_through() {
        let failed = async { Err::<(), _>(anyhow!("connection closed")) };

        let err = within(Duration::from_secs(1), failed).await.unwrap_err();
        assert_eq!(err.to_string(), "connection closed");
    }

    #[tokio::test]
    async fn test_confirmed_publish_returns_ack() {
        let ack = within(Duration::from_secs(1), async { Ok(7u64) }).await.unwrap();
        assert_eq!(ack, 7);
    }
}
