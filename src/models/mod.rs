//! Recovery model: feature scaling and the feed-forward network

pub mod inference;
pub mod loader;
pub mod network;
pub mod scaler;

pub use inference::InferenceEngine;
pub use loader::ModelLoader;
pub use network::{NetworkWeights, RecoveryNet};
pub use scaler::{ScalingParams, StandardScaler};
