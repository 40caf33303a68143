//! Estimation Engine - Main Entry Point
//!
//! Consumes `AccountIngested` envelopes from JetStream, runs the recovery
//! model and publishes `InternalEstimateGenerated` envelopes back to the
//! same subject.

use anyhow::{Context, Result};
use estimation_engine::{
    config::AppConfig,
    consumer::EnvelopeConsumer,
    dispatcher::EventDispatcher,
    feature_extractor::FeatureExtractor,
    handler::EstimationHandler,
    logging,
    metrics::{MetricsReporter, PipelineMetrics},
    models::inference::InferenceEngine,
    producer::EstimateProducer,
    shutdown,
    worker::{EstimationWorker, WorkerSettings},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging)?;

    info!("Starting Estimation Engine");
    info!(
        nats_url = %config.nats.url,
        stream = %config.nats.stream,
        subject = %config.nats.subject,
        consumer_group = %config.nats.consumer_group,
        "Configuration loaded successfully"
    );

    // Artifacts are loaded once and never mutated
    let engine = Arc::new(InferenceEngine::from_config(&config.models)?);
    let extractor = FeatureExtractor::new();
    info!(
        feature_count = extractor.feature_count(),
        features = ?extractor.feature_names(),
        "Feature extractor ready"
    );
    let handler = EstimationHandler::new(engine, config.models.model_id.clone());
    let dispatcher = EventDispatcher::new().with_handler(Arc::new(handler));

    let client = async_nats::ConnectOptions::new()
        .connection_timeout(config.nats.connect_timeout())
        .connect(config.nats.url.as_str())
        .await
        .context("Failed to connect to NATS")?;
    info!("Connected to NATS at {}", config.nats.url);

    let jetstream = async_nats::jetstream::new(client.clone());
    let consumer = EnvelopeConsumer::connect(&jetstream, &config.nats).await?;
    info!("Consuming from stream {} as {}", config.nats.stream, consumer.name());
    let producer =
        EstimateProducer::new(jetstream, &config.nats.subject, config.nats.publish_timeout());
    info!("Publishing estimates to: {}", producer.subject());

    let metrics = Arc::new(PipelineMetrics::new());
    if config.pipeline.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    let token = CancellationToken::new();
    shutdown::spawn_signal_listener(token.clone());

    let settings = WorkerSettings {
        poll_timeout: config.nats.poll_timeout(),
        max_consecutive_publish_failures: config.nats.max_consecutive_publish_failures,
        ..WorkerSettings::default()
    };
    let mut worker = EstimationWorker::new(consumer, producer, dispatcher, metrics.clone(), settings);

    let result = worker.run(token).await;

    info!("Estimation engine shutting down...");
    metrics.print_summary();

    if let Err(e) = client.flush().await {
        error!(error = %e, "Failed to flush NATS connection");
    }

    result
}
