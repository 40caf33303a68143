//! Event envelope and its protobuf codec.
//!
//! Every message on the events stream is an `EventEnvelope`: provenance
//! metadata plus exactly one payload variant, selected by `event_type`.
//! Producers we do not know about may put other variants on the same
//! stream; prost skips their field numbers, so they decode with
//! `payload = None` and an event type we report as [`EventType::Other`].

use crate::error::EnvelopeError;
use chrono::{DateTime, Utc};
use prost::Message;
use prost_types::Timestamp;
use std::fmt;

/// Payload schema version written on outbound envelopes
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Transport wrapper for every event on the stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventEnvelope {
    #[prost(string, tag = "1")]
    pub event_id: String,

    #[prost(string, tag = "2")]
    pub event_type: String,

    #[prost(string, tag = "3")]
    pub source: String,

    #[prost(string, tag = "4")]
    pub schema_version: String,

    #[prost(message, optional, tag = "5")]
    pub occurrence_time: Option<Timestamp>,

    #[prost(message, optional, tag = "6")]
    pub ingestion_time: Option<Timestamp>,

    #[prost(oneof = "event_envelope::Payload", tags = "10, 11")]
    pub payload: Option<event_envelope::Payload>,
}

pub mod event_envelope {
    use crate::types::{AccountIngested, InternalEstimateGenerated};

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "10")]
        AccountIngested(AccountIngested),

        #[prost(message, tag = "11")]
        InternalEstimateGenerated(InternalEstimateGenerated),
    }
}

use event_envelope::Payload;

/// Event type tag carried in `EventEnvelope::event_type`.
///
/// `Other` keeps unknown tags as a normal value so routing code can ignore
/// them without treating them as errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    AccountIngested,
    InternalEstimateGenerated,
    Other(String),
}

impl EventType {
    pub const ACCOUNT_INGESTED: &'static str = "AccountIngested";
    pub const INTERNAL_ESTIMATE_GENERATED: &'static str = "InternalEstimateGenerated";

    pub fn parse(tag: &str) -> Self {
        match tag {
            Self::ACCOUNT_INGESTED => EventType::AccountIngested,
            Self::INTERNAL_ESTIMATE_GENERATED => EventType::InternalEstimateGenerated,
            other => EventType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventType::AccountIngested => Self::ACCOUNT_INGESTED,
            EventType::InternalEstimateGenerated => Self::INTERNAL_ESTIMATE_GENERATED,
            EventType::Other(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Payload {
    /// Event type that must accompany this payload variant
    pub fn event_type(&self) -> EventType {
        match self {
            Payload::AccountIngested(_) => EventType::AccountIngested,
            Payload::InternalEstimateGenerated(_) => EventType::InternalEstimateGenerated,
        }
    }
}

impl EventEnvelope {
    /// Build a fresh envelope with a new `event_id` and both timestamps set to now.
    pub fn new(source: impl Into<String>, payload: Payload) -> Self {
        let now = timestamp_now();

        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: payload.event_type().to_string(),
            source: source.into(),
            schema_version: SCHEMA_VERSION.to_string(),
            occurrence_time: Some(now.clone()),
            ingestion_time: Some(now),
            payload: Some(payload),
        }
    }

    pub fn kind(&self) -> EventType {
        EventType::parse(&self.event_type)
    }

    pub fn account_ingested(&self) -> Option<&crate::types::AccountIngested> {
        match &self.payload {
            Some(Payload::AccountIngested(account)) => Some(account),
            _ => None,
        }
    }

    pub fn internal_estimate_generated(&self) -> Option<&crate::types::InternalEstimateGenerated> {
        match &self.payload {
            Some(Payload::InternalEstimateGenerated(estimate)) => Some(estimate),
            _ => None,
        }
    }

    /// Wall-clock time the event occurred, if present and representable
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.occurrence_time.as_ref().and_then(to_datetime)
    }

    /// Check that `event_type` agrees with the populated payload variant.
    ///
    /// An unknown tag with no recognised payload is consistent: it is some
    /// other producer's event and routing will ignore it.
    pub fn check_payload(&self) -> Result<(), EnvelopeError> {
        let kind = self.kind();
        match &self.payload {
            Some(payload) if payload.event_type() != kind => Err(EnvelopeError::PayloadMismatch {
                event_type: self.event_type.clone(),
                payload: payload_name(payload),
            }),
            None if kind.is_known() => Err(EnvelopeError::PayloadMismatch {
                event_type: self.event_type.clone(),
                payload: "none",
            }),
            _ => Ok(()),
        }
    }
}

fn payload_name(payload: &Payload) -> &'static str {
    match payload {
        Payload::AccountIngested(_) => EventType::ACCOUNT_INGESTED,
        Payload::InternalEstimateGenerated(_) => EventType::INTERNAL_ESTIMATE_GENERATED,
    }
}

/// Decode an envelope from bytes, rejecting malformed input and
/// type/payload mismatches with a typed error.
pub fn decode_envelope(bytes: &[u8]) -> Result<EventEnvelope, EnvelopeError> {
    let envelope = EventEnvelope::decode(bytes)?;
    envelope.check_payload()?;
    Ok(envelope)
}

/// Encode an envelope to its protobuf representation.
pub fn encode_envelope(envelope: &EventEnvelope) -> Vec<u8> {
    envelope.encode_to_vec()
}

pub fn timestamp_now() -> Timestamp {
    let now = Utc::now();
    Timestamp {
        seconds: now.timestamp(),
        nanos: now.timestamp_subsec_nanos() as i32,
    }
}

fn to_datetime(ts: &Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountIngested, InternalEstimateGenerated};

    fn ingested() -> EventEnvelope {
        EventEnvelope::new(
            "test-injector",
            Payload::AccountIngested(AccountIngested::new("a1", 500.0, 30)),
        )
    }

    #[test]
    fn test_new_envelope_metadata() {
        let envelope = ingested();

        assert_eq!(envelope.event_type, "AccountIngested");
        assert_eq!(envelope.schema_version, SCHEMA_VERSION);
        assert_eq!(envelope.source, "test-injector");
        assert!(uuid::Uuid::parse_str(&envelope.event_id).is_ok());
        assert_eq!(envelope.occurrence_time, envelope.ingestion_time);
        assert!(envelope.occurred_at().is_some());
    }

    #[test]
    fn test_decode_reproduces_envelope() {
        let envelope = ingested();
        let decoded = decode_envelope(&encode_envelope(&envelope)).unwrap();

        assert_eq!(decoded, envelope);
        assert_eq!(decoded.account_ingested().unwrap().account_id, "a1");
    }

    #[test]
    fn test_reencode_is_identity() {
        let bytes = encode_envelope(&ingested());
        let decoded = decode_envelope(&bytes).unwrap();

        assert_eq!(encode_envelope(&decoded), bytes);
    }

    #[test]
    fn test_malformed_bytes_rejected() {
        let result = decode_envelope(&[0x0a, 0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(EnvelopeError::Decode(_))));
    }

    #[test]
    fn test_empty_bytes_decode_to_defaults() {
        let envelope = decode_envelope(&[]).unwrap();

        assert_eq!(envelope.event_type, "");
        assert!(envelope.payload.is_none());
        assert_eq!(envelope.kind(), EventType::Other(String::new()));
    }

    #[test]
    fn test_mismatched_payload_rejected() {
        let mut envelope = ingested();
        envelope.event_type = EventType::INTERNAL_ESTIMATE_GENERATED.to_string();

        let result = decode_envelope(&encode_envelope(&envelope));
        assert!(matches!(
            result,
            Err(EnvelopeError::PayloadMismatch { payload: "AccountIngested", .. })
        ));
    }

    #[test]
    fn test_known_type_without_payload_rejected() {
        let mut envelope = ingested();
        envelope.payload = None;

        let result = decode_envelope(&encode_envelope(&envelope));
        assert!(matches!(result, Err(EnvelopeError::PayloadMismatch { payload: "none", .. })));
    }

    #[test]
    fn test_unknown_variant_from_other_producer() {
        // AccountRecovered-style event: unknown tag, payload in field 12.
        let mut bytes = encode_envelope(&EventEnvelope {
            event_id: "e1".to_string(),
            event_type: "AccountRecovered".to_string(),
            ..Default::default()
        });
        let inner = AccountIngested::new("a9", 1.0, 1).encode_to_vec();
        bytes.push((12 << 3) | 2);
        bytes.push(inner.len() as u8);
        bytes.extend_from_slice(&inner);

        let envelope = decode_envelope(&bytes).unwrap();
        assert_eq!(envelope.kind(), EventType::Other("AccountRecovered".to_string()));
        assert!(envelope.payload.is_none());
    }

    #[test]
    fn test_estimate_payload_accessor() {
        let envelope = EventEnvelope::new(
            "estimation-engine-ml",
            Payload::InternalEstimateGenerated(InternalEstimateGenerated {
                model_id: "m".to_string(),
                target_account_id: "a1".to_string(),
                raw_recovery_probability: 0.4,
                estimated_effort_hours: 3.0,
            }),
        );

        assert_eq!(envelope.kind(), EventType::InternalEstimateGenerated);
        assert!(envelope.account_ingested().is_none());
        assert_eq!(envelope.internal_estimate_generated().unwrap().target_account_id, "a1");
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!(EventType::parse("AccountIngested"), EventType::AccountIngested);
        assert!(!EventType::parse("AccountEscalated").is_known());
        assert_eq!(EventType::parse("AccountEscalated").as_str(), "AccountEscalated");
    }
}
