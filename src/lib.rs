//! Estimation Engine Library
//!
//! Streaming worker that turns `AccountIngested` events into
//! `InternalEstimateGenerated` events using a small feed-forward
//! recovery model, over a NATS JetStream events stream.

pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod feature_extractor;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod shutdown;
pub mod types;
pub mod worker;

pub use config::AppConfig;
pub use consumer::{EnvelopeConsumer, EventSource, InboundMessage};
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use feature_extractor::FeatureExtractor;
pub use handler::{EstimationHandler, EventHandler};
pub use models::inference::InferenceEngine;
pub use producer::{EstimateProducer, EstimateSink};
pub use types::{AccountIngested, EventEnvelope, EventType, InternalEstimateGenerated};
pub use worker::{EstimationWorker, MessageOutcome, WorkerSettings, WorkerState};
