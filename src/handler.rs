//! Estimation handler: account in, recovery estimate out.

use crate::error::{EstimateError, HandlerError};
use crate::feature_extractor::FeatureExtractor;
use crate::models::inference::InferenceEngine;
use crate::types::{AccountIngested, EventEnvelope, EventType, InternalEstimateGenerated, Payload};
use std::sync::Arc;
use tracing::info;

/// `source` stamped on every outbound envelope
pub const ENGINE_SOURCE: &str = "estimation-engine-ml";

/// Handler for one event type.
///
/// Handlers are pure: no I/O, no blocking. A returned envelope is what the
/// worker publishes; an error is contained by the dispatcher.
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> EventType;

    fn handle(&self, envelope: &EventEnvelope) -> Result<EventEnvelope, HandlerError>;
}

/// Effort heuristic, independent of the model: two hours plus one per month overdue.
pub fn estimated_effort_hours(days_past_due: i32) -> f64 {
    2.0 + f64::from(days_past_due) / 30.0
}

/// Produces `InternalEstimateGenerated` events from `AccountIngested` events.
pub struct EstimationHandler {
    engine: Arc<InferenceEngine>,
    extractor: FeatureExtractor,
    model_id: String,
}

impl EstimationHandler {
    pub fn new(engine: Arc<InferenceEngine>, model_id: impl Into<String>) -> Self {
        Self {
            engine,
            extractor: FeatureExtractor::new(),
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Run the full estimate for one account.
    pub fn estimate(&self, account: &AccountIngested) -> Result<InternalEstimateGenerated, EstimateError> {
        let features = self
            .extractor
            .extract(account)
            .map_err(|source| EstimateError::Features {
                account_id: account.account_id.clone(),
                source,
            })?;

        let probability = self
            .engine
            .predict(&features)
            .map_err(|source| EstimateError::Inference {
                account_id: account.account_id.clone(),
                source,
            })?;

        Ok(InternalEstimateGenerated {
            model_id: self.model_id.clone(),
            target_account_id: account.account_id.clone(),
            raw_recovery_probability: probability,
            estimated_effort_hours: estimated_effort_hours(account.days_past_due),
        })
    }
}

impl EventHandler for EstimationHandler {
    fn event_type(&self) -> EventType {
        EventType::AccountIngested
    }

    fn handle(&self, envelope: &EventEnvelope) -> Result<EventEnvelope, HandlerError> {
        let account = envelope
            .account_ingested()
            .ok_or(HandlerError::MissingPayload(EventType::ACCOUNT_INGESTED))?;

        info!(account_id = %account.account_id, "Inferencing for account");
        let estimate = self.estimate(account)?;

        Ok(EventEnvelope::new(
            ENGINE_SOURCE,
            Payload::InternalEstimateGenerated(estimate),
        ))
    }
}
