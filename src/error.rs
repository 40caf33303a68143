//! Typed failures for the per-message path and for artifact validation.
//!
//! Startup and bus plumbing use `anyhow`; these enums exist where callers
//! need to match on the failure or attach it to a log line.

use thiserror::Error;

/// Failure to turn raw bytes into a usable envelope.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("malformed envelope bytes: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("event_type {event_type:?} does not match payload {payload}")]
    PayloadMismatch {
        event_type: String,
        payload: &'static str,
    },
}

/// Inbound account fields that cannot be turned into model features.
#[derive(Error, Debug, PartialEq)]
pub enum FeatureError {
    #[error("outstanding_balance must be a finite non-negative number, got {0}")]
    InvalidBalance(f64),

    #[error("days_past_due must be non-negative, got {0}")]
    NegativeDaysPastDue(i32),
}

/// Numeric failure inside the forward pass.
#[derive(Error, Debug, PartialEq)]
pub enum InferenceError {
    #[error("scaled feature {index} is not finite ({value})")]
    NonFiniteFeature { index: usize, value: f64 },

    #[error("model produced a non-finite probability ({0})")]
    NonFiniteOutput(f64),
}

/// Everything that can go wrong while estimating a single account.
#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("account {account_id}: {source}")]
    Features {
        account_id: String,
        #[source]
        source: FeatureError,
    },

    #[error("account {account_id}: {source}")]
    Inference {
        account_id: String,
        #[source]
        source: InferenceError,
    },
}

impl EstimateError {
    pub fn account_id(&self) -> &str {
        match self {
            EstimateError::Features { account_id, .. } => account_id,
            EstimateError::Inference { account_id, .. } => account_id,
        }
    }
}

/// Error raised by an event handler; contained at the dispatch boundary.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("envelope carries no {0} payload")]
    MissingPayload(&'static str),

    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

/// A loaded model or scaling artifact that fails validation.
#[derive(Error, Debug, PartialEq)]
pub enum ArtifactError {
    #[error("expected {expected} scaling features, found {found} means and {stds} standard deviations")]
    FeatureCount {
        expected: usize,
        found: usize,
        stds: usize,
    },

    #[error("standard deviation for feature {index} must be finite and positive, got {value}")]
    DegenerateStd { index: usize, value: f64 },

    #[error("mean for feature {index} is not finite ({value})")]
    NonFiniteMean { index: usize, value: f64 },

    #[error("layer {layer}: expected {expected} got {found}")]
    Shape {
        layer: &'static str,
        expected: String,
        found: String,
    },

    #[error("layer {layer} contains a non-finite parameter")]
    NonFiniteParameter { layer: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_error_carries_account_id() {
        let err = EstimateError::Features {
            account_id: "a1".to_string(),
            source: FeatureError::NegativeDaysPastDue(-3),
        };

        assert_eq!(err.account_id(), "a1");
        assert!(err.to_string().contains("a1"));
        assert!(err.to_string().contains("-3"));
    }
}
