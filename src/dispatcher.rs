//! Routes decoded envelopes to the handler registered for their event type.

use crate::error::HandlerError;
use crate::handler::EventHandler;
use crate::types::{EventEnvelope, EventType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// What happened to one envelope at the dispatch boundary.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A handler produced an envelope to publish
    Handled(EventEnvelope),
    /// No handler for this event type; not an error
    Ignored,
    /// The handler failed; already logged, the message should be dropped
    Failed(HandlerError),
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled(_))
    }
}

/// Event-type router. Unknown types are ignored so newer producers can
/// share the stream.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: HashMap<EventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own event type, replacing any previous one
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.insert(handler.event_type(), handler);
        self
    }

    pub fn handles(&self, event_type: &EventType) -> bool {
        self.handlers.contains_key(event_type)
    }

    pub fn dispatch(&self, envelope: &EventEnvelope) -> DispatchOutcome {
        let kind = envelope.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            debug!(event_id = %envelope.event_id, event_type = %kind, "Ignoring event type");
            return DispatchOutcome::Ignored;
        };

        match handler.handle(envelope) {
            Ok(outbound) => DispatchOutcome::Handled(outbound),
            Err(e) => {
                error!(
                    event_id = %envelope.event_id,
                    event_type = %kind,
                    account_id = envelope.account_ingested().map(|a| a.account_id.as_str()),
                    error = %e,
                    "Failed to process message"
                );
                DispatchOutcome::Failed(e)
            }
        }
    }
}
