use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for a published event.
///
/// - `commit_sequence` orders envelopes by the commit that produced them;
///   envelopes from one commit share the sequence and keep their emission order.
/// - `payload` is the event body (typically JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    event_type: String,

    subject_id: Uuid,
    subject_type: String,

    commit_sequence: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        event_type: impl Into<String>,
        subject_id: Uuid,
        subject_type: impl Into<String>,
        commit_sequence: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            subject_id,
            subject_type: subject_type.into(),
            commit_sequence,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn commit_sequence(&self) -> u64 {
        self.commit_sequence
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
