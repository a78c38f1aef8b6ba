//! Message protocol between the application context and the worker
//! context. The two sides share no memory; these messages and the durable
//! store are the only channels between them.

use serde::{Deserialize, Serialize};

use crate::providers::TranscriptionResponse;

/// Messages the application sends to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Force a waiting worker update to activate immediately
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

/// Informational events the worker broadcasts to application contexts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    /// A queued transcription request was replayed successfully
    #[serde(rename = "TRANSCRIPTION_COMPLETED")]
    TranscriptionCompleted {
        id: String,
        data: TranscriptionResponse,
    },
    /// The dynamic cache gained or refreshed an entry
    #[serde(rename = "CACHE_UPDATE")]
    CacheUpdate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skip_waiting_wire_format() {
        let msg: ClientMessage = serde_json::from_value(json!({"type": "SKIP_WAITING"})).unwrap();
        assert_eq!(msg, ClientMessage::SkipWaiting);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "SKIP_WAITING"})
        );
    }

    #[test]
    fn test_completed_event_wire_format() {
        let event = WorkerEvent::TranscriptionCompleted {
            id: "abc".to_string(),
            data: TranscriptionResponse {
                text: "hello".to_string(),
            },
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "TRANSCRIPTION_COMPLETED");
        assert_eq!(value["id"], "abc");
        assert_eq!(value["data"]["text"], "hello");
    }
}
