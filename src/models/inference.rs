//! Inference engine: scaling followed by the recovery network

use crate::config::ModelsConfig;
use crate::error::InferenceError;
use crate::feature_extractor::FEATURE_COUNT;
use crate::models::loader::ModelLoader;
use crate::models::network::RecoveryNet;
use crate::models::scaler::StandardScaler;
use anyhow::Result;
use tracing::{debug, info};

/// Immutable scaler + network pair, loaded once at startup and shared
/// read-only by every message.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    scaler: StandardScaler,
    network: RecoveryNet,
}

impl InferenceEngine {
    /// Load both artifacts named in the configuration
    pub fn from_config(config: &ModelsConfig) -> Result<Self> {
        let loader = ModelLoader::new();
        let scaler = loader.load_scaler(&config.scaler_path)?;
        let network = loader.load_network(&config.weights_path)?;

        info!(model_id = %config.model_id, "Inference engine initialized");
        Ok(Self::new(scaler, network))
    }

    pub fn new(scaler: StandardScaler, network: RecoveryNet) -> Self {
        Self { scaler, network }
    }

    /// Recovery probability for raw `[balance, days_past_due]` features
    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, InferenceError> {
        let scaled = self.scaler.transform(features);
        if let Some((index, &value)) = scaled.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(InferenceError::NonFiniteFeature { index, value });
        }

        let probability = self.network.forward(&scaled);
        if !probability.is_finite() {
            return Err(InferenceError::NonFiniteOutput(probability));
        }

        debug!(scaled = ?scaled.to_vec(), probability, "Inference complete");
        Ok(probability)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::network::tests::sample_weights;
    use crate::models::scaler::ScalingParams;

    pub(crate) fn sample_engine() -> InferenceEngine {
        let scaler = StandardScaler::from_params(ScalingParams {
            mean: vec![1000.0, 90.0],
            std: vec![800.0, 50.0],
        })
        .unwrap();
        let network = RecoveryNet::from_weights(sample_weights()).unwrap();
        InferenceEngine::new(scaler, network)
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let engine = sample_engine();

        let first = engine.predict(&[1000.0, 90.0]).unwrap();
        let second = engine.predict(&[1000.0, 90.0]).unwrap();

        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_prediction_in_unit_interval() {
        let engine = sample_engine();

        for features in [[0.0, 0.0], [500.0, 30.0], [3000.0, 180.0]] {
            let p = engine.predict(&features).unwrap();
            assert!(p > 0.0 && p < 1.0, "probability {p} for {features:?}");
        }
    }

    #[test]
    fn test_extreme_accounts_stay_in_unit_interval() {
        let engine = sample_engine();

        for features in [[1e9, 30.0], [1e12, 0.0], [0.0, f64::from(i32::MAX)]] {
            let p = engine.predict(&features).unwrap();
            assert!(p > 0.0 && p < 1.0, "probability {p} for {features:?}");
        }
    }

    #[test]
    fn test_non_finite_feature_rejected() {
        let engine = sample_engine();

        let err = engine.predict(&[f64::INFINITY, 1.0]).unwrap_err();
        assert!(matches!(err, InferenceError::NonFiniteFeature { index: 0, .. }));
    }
}
