//! Fixed 2-16-8-1 feed-forward recovery network

use crate::error::ArtifactError;
use crate::feature_extractor::FEATURE_COUNT;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

pub const HIDDEN1: usize = 16;
pub const HIDDEN2: usize = 8;
pub const OUTPUTS: usize = 1;

/// Smallest probability the network reports
pub const PROBABILITY_FLOOR: f64 = f64::MIN_POSITIVE;
/// Largest f64 below 1.0
pub const PROBABILITY_CEILING: f64 = 1.0 - f64::EPSILON / 2.0;

/// Parameters of one linear layer as exported from a PyTorch state dict.
/// `weight` is `[out][in]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerWeights {
    pub weight: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

/// Persisted network parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkWeights {
    pub fc1: LayerWeights,
    pub fc2: LayerWeights,
    pub fc3: LayerWeights,
}

#[derive(Debug, Clone)]
struct Linear {
    weight: Array2<f64>,
    bias: Array1<f64>,
}

impl Linear {
    fn from_weights(
        layer: &'static str,
        weights: LayerWeights,
        inputs: usize,
        outputs: usize,
    ) -> Result<Self, ArtifactError> {
        let rows = weights.weight.len();
        let ragged = weights.weight.iter().find(|row| row.len() != inputs);
        if rows != outputs || ragged.is_some() {
            return Err(ArtifactError::Shape {
                layer,
                expected: format!("weight [{outputs}, {inputs}]"),
                found: format!(
                    "weight [{rows}, {}]",
                    ragged.or(weights.weight.first()).map_or(0, Vec::len)
                ),
            });
        }
        if weights.bias.len() != outputs {
            return Err(ArtifactError::Shape {
                layer,
                expected: format!("bias [{outputs}]"),
                found: format!("bias [{}]", weights.bias.len()),
            });
        }

        let flat: Vec<f64> = weights.weight.into_iter().flatten().collect();
        if flat.iter().chain(weights.bias.iter()).any(|v| !v.is_finite()) {
            return Err(ArtifactError::NonFiniteParameter { layer });
        }

        let weight = Array2::from_shape_vec((outputs, inputs), flat).map_err(|e| {
            ArtifactError::Shape {
                layer,
                expected: format!("weight [{outputs}, {inputs}]"),
                found: e.to_string(),
            }
        })?;

        Ok(Self {
            weight,
            bias: Array1::from_vec(weights.bias),
        })
    }

    fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        self.weight.dot(input) + &self.bias
    }

    fn to_weights(&self) -> LayerWeights {
        LayerWeights {
            weight: self.weight.rows().into_iter().map(|r| r.to_vec()).collect(),
            bias: self.bias.to_vec(),
        }
    }
}

/// Recovery-probability network: `sigmoid(fc3(relu(fc2(relu(fc1(x))))))`.
#[derive(Debug, Clone)]
pub struct RecoveryNet {
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
}

impl RecoveryNet {
    pub fn from_weights(weights: NetworkWeights) -> Result<Self, ArtifactError> {
        Ok(Self {
            fc1: Linear::from_weights("fc1", weights.fc1, FEATURE_COUNT, HIDDEN1)?,
            fc2: Linear::from_weights("fc2", weights.fc2, HIDDEN1, HIDDEN2)?,
            fc3: Linear::from_weights("fc3", weights.fc3, HIDDEN2, OUTPUTS)?,
        })
    }

    /// Forward pass over already-scaled features.
    pub fn forward(&self, scaled: &Array1<f64>) -> f64 {
        let h1 = self.fc1.forward(scaled).mapv(relu);
        let h2 = self.fc2.forward(&h1).mapv(relu);
        sigmoid(self.fc3.forward(&h2)[0])
    }

    pub fn weights(&self) -> NetworkWeights {
        NetworkWeights {
            fc1: self.fc1.to_weights(),
            fc2: self.fc2.to_weights(),
            fc3: self.fc3.to_weights(),
        }
    }
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// Logistic function, held strictly inside (0, 1) so a saturated logit
/// never reports certainty.
fn sigmoid(x: f64) -> f64 {
    let y = if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    };
    y.clamp(PROBABILITY_FLOOR, PROBABILITY_CEILING)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn layer(inputs: usize, outputs: usize, seed: f64) -> LayerWeights {
        LayerWeights {
            weight: (0..outputs)
                .map(|o| {
                    (0..inputs)
                        .map(|i| ((o * inputs + i) as f64 * 0.37 + seed).sin() * 0.25)
                        .collect()
                })
                .collect(),
            bias: (0..outputs).map(|o| (o as f64 + seed).cos() * 0.1).collect(),
        }
    }

    /// Deterministic, non-trivial weights for tests.
    pub(crate) fn sample_weights() -> NetworkWeights {
        NetworkWeights {
            fc1: layer(FEATURE_COUNT, HIDDEN1, 0.1),
            fc2: layer(HIDDEN1, HIDDEN2, 0.2),
            fc3: layer(HIDDEN2, OUTPUTS, 0.3),
        }
    }

    fn zero_weights() -> NetworkWeights {
        NetworkWeights {
            fc1: LayerWeights {
                weight: vec![vec![0.0; FEATURE_COUNT]; HIDDEN1],
                bias: vec![0.0; HIDDEN1],
            },
            fc2: LayerWeights {
                weight: vec![vec![0.0; HIDDEN1]; HIDDEN2],
                bias: vec![0.0; HIDDEN2],
            },
            fc3: LayerWeights {
                weight: vec![vec![0.0; HIDDEN2]; OUTPUTS],
                bias: vec![0.0; OUTPUTS],
            },
        }
    }

    #[test]
    fn test_zero_network_outputs_half() {
        let net = RecoveryNet::from_weights(zero_weights()).unwrap();
        let out = net.forward(&Array1::from_vec(vec![3.0, -2.0]));
        assert_eq!(out, 0.5);
    }

    #[test]
    fn test_output_bias_drives_sigmoid() {
        let mut weights = zero_weights();
        weights.fc3.bias = vec![2.0];
        let net = RecoveryNet::from_weights(weights).unwrap();

        let out = net.forward(&Array1::from_vec(vec![0.0, 0.0]));
        assert!((out - 1.0 / (1.0 + (-2.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_relu_blocks_negative_hidden_units() {
        let mut weights = zero_weights();
        // fc1 unit 0 = -x0; fc2 unit 0 = h1[0]; output = h2[0]
        weights.fc1.weight[0][0] = -1.0;
        weights.fc2.weight[0][0] = 1.0;
        weights.fc3.weight[0][0] = 1.0;
        let net = RecoveryNet::from_weights(weights).unwrap();

        assert_eq!(net.forward(&Array1::from_vec(vec![4.0, 0.0])), 0.5);
        let active = net.forward(&Array1::from_vec(vec![-4.0, 0.0]));
        assert!((active - 1.0 / (1.0 + (-4.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_output_in_open_unit_interval() {
        let net = RecoveryNet::from_weights(sample_weights()).unwrap();

        for x in [-5.0, -1.0, 0.0, 1.0, 5.0] {
            let out = net.forward(&Array1::from_vec(vec![x, -x]));
            assert!(out > 0.0 && out < 1.0, "output {out} out of range");
        }
    }

    #[test]
    fn test_saturated_logit_stays_inside_unit_interval() {
        let mut weights = zero_weights();
        weights.fc3.bias = vec![-1000.0];
        let low = RecoveryNet::from_weights(weights.clone()).unwrap();
        assert_eq!(low.forward(&Array1::from_vec(vec![0.0, 0.0])), PROBABILITY_FLOOR);

        weights.fc3.bias = vec![1000.0];
        let high = RecoveryNet::from_weights(weights).unwrap();
        assert_eq!(high.forward(&Array1::from_vec(vec![0.0, 0.0])), PROBABILITY_CEILING);
        assert!(PROBABILITY_CEILING < 1.0);
    }

    #[test]
    fn test_sigmoid_negative_branch_matches() {
        for x in [-30.0f64, -5.0, -0.5] {
            let expected = 1.0 / (1.0 + (-x).exp());
            assert!((sigmoid(x) - expected).abs() < 1e-15);
        }
    }

    #[test]
    fn test_weights_round_trip() {
        let net = RecoveryNet::from_weights(sample_weights()).unwrap();
        assert_eq!(net.weights(), sample_weights());
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let mut weights = sample_weights();
        weights.fc2.weight.pop();

        let err = RecoveryNet::from_weights(weights).unwrap_err();
        assert!(matches!(err, ArtifactError::Shape { layer: "fc2", .. }));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let mut weights = sample_weights();
        weights.fc1.weight[3].push(1.0);

        let err = RecoveryNet::from_weights(weights).unwrap_err();
        assert!(matches!(err, ArtifactError::Shape { layer: "fc1", .. }));
    }

    #[test]
    fn test_bias_length_rejected() {
        let mut weights = sample_weights();
        weights.fc3.bias.push(0.0);

        assert!(RecoveryNet::from_weights(weights).is_err());
    }

    #[test]
    fn test_non_finite_parameter_rejected() {
        let mut weights = sample_weights();
        weights.fc2.bias[0] = f64::NAN;

        assert_eq!(
            RecoveryNet::from_weights(weights).unwrap_err(),
            ArtifactError::NonFiniteParameter { layer: "fc2" }
        );
    }
}
