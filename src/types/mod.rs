//! Wire types for the events stream

pub mod account;
pub mod envelope;
pub mod estimate;

pub use account::AccountIngested;
pub use envelope::{decode_envelope, encode_envelope, event_envelope::Payload, EventEnvelope, EventType};
pub use estimate::InternalEstimateGenerated;
