//! Per-feature standardization fitted by the training pipeline

use crate::error::ArtifactError;
use crate::feature_extractor::FEATURE_COUNT;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Persisted scaler parameters, one entry per feature.
///
/// `scale` is accepted for `std` so a scikit-learn `StandardScaler` export
/// (`mean_`, `scale_`) can be dumped as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingParams {
    pub mean: Vec<f64>,
    #[serde(alias = "scale")]
    pub std: Vec<f64>,
}

/// Validated standardization transform: `(x - mean) / std`.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl StandardScaler {
    /// Validate persisted parameters. A zero or non-finite deviation is
    /// rejected here so it can never surface per message.
    pub fn from_params(params: ScalingParams) -> Result<Self, ArtifactError> {
        if params.mean.len() != FEATURE_COUNT || params.std.len() != FEATURE_COUNT {
            return Err(ArtifactError::FeatureCount {
                expected: FEATURE_COUNT,
                found: params.mean.len(),
                stds: params.std.len(),
            });
        }

        for (index, &value) in params.mean.iter().enumerate() {
            if !value.is_finite() {
                return Err(ArtifactError::NonFiniteMean { index, value });
            }
        }

        for (index, &value) in params.std.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(ArtifactError::DegenerateStd { index, value });
            }
        }

        Ok(Self {
            mean: Array1::from_vec(params.mean),
            std: Array1::from_vec(params.std),
        })
    }

    pub fn transform(&self, raw: &[f64; FEATURE_COUNT]) -> Array1<f64> {
        (Array1::from_iter(raw.iter().copied()) - &self.mean) / &self.std
    }

    pub fn params(&self) -> ScalingParams {
        ScalingParams {
            mean: self.mean.to_vec(),
            std: self.std.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> StandardScaler {
        StandardScaler::from_params(ScalingParams {
            mean: vec![1000.0, 90.0],
            std: vec![800.0, 50.0],
        })
        .unwrap()
    }

    #[test]
    fn test_transform() {
        let scaled = scaler().transform(&[500.0, 30.0]);

        assert!((scaled[0] - -0.625).abs() < 1e-12);
        assert!((scaled[1] - -1.2).abs() < 1e-12);
    }

    #[test]
    fn test_mean_maps_to_zero() {
        let scaled = scaler().transform(&[1000.0, 90.0]);
        assert_eq!(scaled.to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_zero_std_rejected() {
        let result = StandardScaler::from_params(ScalingParams {
            mean: vec![0.0, 0.0],
            std: vec![1.0, 0.0],
        });

        assert_eq!(
            result.unwrap_err(),
            ArtifactError::DegenerateStd { index: 1, value: 0.0 }
        );
    }

    #[test]
    fn test_wrong_feature_count_rejected() {
        let result = StandardScaler::from_params(ScalingParams {
            mean: vec![0.0, 0.0, 0.0],
            std: vec![1.0, 1.0],
        });

        assert!(matches!(result, Err(ArtifactError::FeatureCount { found: 3, .. })));
    }

    #[test]
    fn test_scale_alias() {
        let params: ScalingParams =
            serde_json::from_str(r#"{"mean": [1.0, 2.0], "scale": [3.0, 4.0]}"#).unwrap();
        assert_eq!(params.std, vec![3.0, 4.0]);
    }
}
