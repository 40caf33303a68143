//! Feature extraction for recovery model inference.
//!
//! The model was trained on two raw columns, `balance` and `days_past_due`,
//! in that order. The extractor validates the inbound values and lays them
//! out the same way; scaling happens later in the inference engine.

use crate::error::FeatureError;
use crate::types::AccountIngested;

/// Number of model input features
pub const FEATURE_COUNT: usize = 2;

/// Turns ingested accounts into raw model input features.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract `[outstanding_balance, days_past_due]` from an account.
    pub fn extract(&self, account: &AccountIngested) -> Result<[f64; FEATURE_COUNT], FeatureError> {
        let balance = account.outstanding_balance;
        if !balance.is_finite() || balance < 0.0 {
            return Err(FeatureError::InvalidBalance(balance));
        }

        if account.days_past_due < 0 {
            return Err(FeatureError::NegativeDaysPastDue(account.days_past_due));
        }

        Ok([balance, f64::from(account.days_past_due)])
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (matching training column order).
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        ["balance", "days_past_due"]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
