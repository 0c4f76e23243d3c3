//! Wire envelopes exchanged over a live session.
//!
//! Both directions use `{"type": ..., "payload": ...}`. Outbound events are
//! typed; inbound envelopes keep the payload as raw JSON because their types
//! belong to whichever handler is plugged into the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::matches::ApplicationStatus;

/// Inbound frame as decoded from the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Events the core and its collaborators push to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Event {
    Match(MatchEvent),
    Message(MessageEvent),
    StatusUpdate(StatusUpdateEvent),
    Typing(TypingEvent),
    Interview(serde_json::Value),
    InterviewUpdate(serde_json::Value),
    InterviewResult(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub match_id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub match_id: Uuid,
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateEvent {
    pub match_id: Uuid,
    pub job_title: String,
    pub new_status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingEvent {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub is_typing: bool,
}

/// Inbound `typing` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TypingPayload {
    pub match_id: Uuid,
    #[serde(default)]
    pub is_typing: Option<bool>,
}

/// Inbound `message` payload: a chat message sent over the live session.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatPayload {
    pub match_id: Uuid,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_as_type_and_payload() {
        let event = Event::StatusUpdate(StatusUpdateEvent {
            match_id: Uuid::nil(),
            job_title: "Rust Engineer".to_string(),
            new_status: ApplicationStatus::Interview,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "status_update");
        assert_eq!(value["payload"]["new_status"], "interview");

        // the generic envelope reads any typed event
        let envelope: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(envelope.kind, "status_update");
    }

    #[test]
    fn collaborator_events_keep_their_payload() {
        let event = Event::InterviewUpdate(serde_json::json!({ "interview_id": 42 }));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "interview_update");
        assert_eq!(value["payload"]["interview_id"], 42);
    }

    #[test]
    fn envelope_payload_is_optional() {
        let envelope: Envelope = serde_json::from_str(r#"{"type":"typing"}"#).unwrap();
        assert_eq!(envelope.payload, serde_json::Value::Null);
    }
}
