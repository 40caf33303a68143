//! JetStream consumer for inbound envelopes

use crate::config::NatsConfig;
use anyhow::{anyhow, Context, Result};
use async_nats::jetstream::{self, consumer::PullConsumer, AckKind};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info};

/// A message taken from the bus, with its commit handle.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    fn payload(&self) -> &[u8];

    /// Acknowledge the message so it is not redelivered
    async fn commit(&self) -> Result<()>;

    /// Ask the bus to redeliver the message
    async fn reject(&self) -> Result<()>;
}

/// Source of inbound messages.
#[async_trait]
pub trait EventSource: Send {
    type Message: InboundMessage;

    /// Wait at most `wait` for the next message. `Ok(None)` means the wait
    /// elapsed with nothing available.
    async fn poll(&mut self, wait: Duration) -> Result<Option<Self::Message>>;

    /// Release the subscription. Polling after close is an error.
    async fn close(&mut self) -> Result<()>;
}

/// Durable JetStream pull consumer.
///
/// The durable name plays the role of a consumer group: every engine
/// instance using the same name shares delivery from one position.
pub struct EnvelopeConsumer {
    consumer: Option<PullConsumer>,
    name: String,
}

impl EnvelopeConsumer {
    /// Ensure the stream exists and bind (or create) the durable consumer.
    /// A new consumer starts from the earliest retained message.
    pub async fn connect(jetstream: &jetstream::Context, config: &NatsConfig) -> Result<Self> {
        debug!(
            stream = %config.stream,
            consumer = %config.consumer_group,
            subject = %config.subject,
            "Creating JetStream consumer"
        );

        let stream = jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: config.stream.clone(),
                subjects: vec![config.subject.clone()],
                description: Some("Account lifecycle events".to_string()),
                ..Default::default()
            })
            .await
            .context("Failed to get or create stream")?;

        let consumer = stream
            .get_or_create_consumer(
                &config.consumer_group,
                jetstream::consumer::pull::Config {
                    name: Some(config.consumer_group.clone()),
                    durable_name: Some(config.consumer_group.clone()),
                    filter_subject: config.subject.clone(),
                    deliver_policy: jetstream::consumer::DeliverPolicy::All,
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .context("Failed to create consumer")?;

        info!(
            stream = %config.stream,
            consumer = %config.consumer_group,
            "Subscribed to events subject"
        );

        Ok(Self {
            consumer: Some(consumer),
            name: config.consumer_group.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl EventSource for EnvelopeConsumer {
    type Message = jetstream::Message;

    async fn poll(&mut self, wait: Duration) -> Result<Option<Self::Message>> {
        let consumer = self
            .consumer
            .as_ref()
            .ok_or_else(|| anyhow!("Consumer {} is closed", self.name))?;

        let mut batch = consumer
            .fetch()
            .max_messages(1)
            .expires(wait)
            .messages()
            .await
            .map_err(|e| anyhow!("Failed to fetch messages: {}", e))?;

        match batch.next().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(anyhow!("Error receiving message: {}", e)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.consumer.take().is_some() {
            info!(consumer = %self.name, "Subscription closed");
        }
        Ok(())
    }
}

#[async_trait]
impl InboundMessage for jetstream::Message {
    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    async fn commit(&self) -> Result<()> {
        self.ack()
            .await
            .map_err(|e| anyhow!("Failed to acknowledge message: {}", e))
    }

    async fn reject(&self) -> Result<()> {
        self.ack_with(AckKind::Nak(None))
            .await
            .map_err(|e| anyhow!("Failed to nak message: {}", e))
    }
}
