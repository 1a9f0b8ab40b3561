use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use xm_core::events::DomainEvent;

type Encoder = Box<dyn FnOnce() -> Result<Bytes, serde_json::Error> + Send + 'static>;

/// One outbound message waiting in the dispatcher queue.
///
/// The payload is captured as-is and only serialized by the worker, so a
/// caller never pays for encoding on the request path.
pub struct QueueCommand {
    routing_key: String,
    encode: Encoder,
}

impl QueueCommand {
    pub fn new<P>(routing_key: impl Into<String>, payload: P) -> Self
    where
        P: Serialize + Send + 'static,
    {
        Self {
            routing_key: routing_key.into(),
            encode: Box::new(move || serde_json::to_vec(&payload).map(Bytes::from)),
        }
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Consumes the command, returning its routing key and JSON body.
    pub(crate) fn into_message(self) -> (String, Result<Bytes, serde_json::Error>) {
        let body = (self.encode)();
        (self.routing_key, body)
    }
}

impl From<DomainEvent> for QueueCommand {
    fn from(event: DomainEvent) -> Self {
        QueueCommand::new(event.routing_key(), event)
    }
}

impl fmt::Debug for QueueCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueCommand")
            .field("routing_key", &self.routing_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_is_encoded_as_json() {
        let (key, body) = QueueCommand::new("company.created", json!({"id": "42"})).into_message();
        assert_eq!(key, "company.created");
        assert_eq!(body.unwrap(), Bytes::from(r#"{"id":"42"}"#));
    }

    #[test]
    fn test_domain_event_routes_by_event_type() {
        let command = QueueCommand::from(DomainEvent::company_deleted("7"));
        assert_eq!(command.routing_key(), "company.deleted");
    }
}
