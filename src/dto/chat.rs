use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat line within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message identifier.
    pub id: Uuid,
    /// Display name of the sender.
    pub sender_name: String,
    /// Message text.
    pub body: String,
    /// RFC 3339 creation timestamp; lexical order equals chronological order.
    pub created_at: String,
}

/// Payload of `GET /api/play/sessions/{id}/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Messages, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// Body of `POST /api/play/sessions/{id}/chat`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendChatRequest {
    /// Message text.
    pub body: String,
}

/// Body of `POST /api/play/sessions/{id}/signals`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignalRequest {
    /// Signal channel, e.g. `help`.
    pub channel: String,
    /// Optional note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
