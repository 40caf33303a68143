//! Loader for the persisted training artifacts

use crate::models::network::{NetworkWeights, RecoveryNet};
use crate::models::scaler::{ScalingParams, StandardScaler};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::info;

/// Reads and validates the scaler and network artifacts.
///
/// Every failure here is startup-fatal; nothing is retried.
pub struct ModelLoader;

impl ModelLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load the feature scaler from a JSON parameter file
    pub fn load_scaler<P: AsRef<Path>>(&self, path: P) -> Result<StandardScaler> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading scaling parameters");

        let params: ScalingParams = read_json(path)?;
        let scaler = StandardScaler::from_params(params)
            .with_context(|| format!("Invalid scaling parameters in {}", path.display()))?;

        info!(
            mean = ?scaler.params().mean,
            std = ?scaler.params().std,
            "Scaling parameters loaded"
        );
        Ok(scaler)
    }

    /// Load the recovery network from a JSON weights file
    pub fn load_network<P: AsRef<Path>>(&self, path: P) -> Result<RecoveryNet> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model weights");

        let weights: NetworkWeights = read_json(path)?;
        let network = RecoveryNet::from_weights(weights)
            .with_context(|| format!("Invalid model weights in {}", path.display()))?;

        info!("Model weights loaded successfully");
        Ok(network)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse artifact {}", path.display()))
}
