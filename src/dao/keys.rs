//! Local storage key layout.

use uuid::Uuid;

const RUN_PREFIX: &str = "play-run:";
const TOKEN_PREFIX: &str = "play-participant-token:";
const JOIN_PREF_PREFIX: &str = "play-join-pref:";
const CHAT_READ_PREFIX: &str = "play-chat-read:";
/// Number of token characters mixed into the chat marker key.
const TOKEN_KEY_CHARS: usize = 8;

/// Viewer role used to separate chat markers of a host and a participant on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// Facilitator view.
    Host,
    /// Participant view.
    Participant,
}

impl ChatRole {
    fn as_str(self) -> &'static str {
        match self {
            ChatRole::Host => "host",
            ChatRole::Participant => "participant",
        }
    }
}

/// `play-run:{runId}`
pub fn run_progress(run_id: Uuid) -> String {
    format!("{RUN_PREFIX}{run_id}")
}

/// `play-participant-token:{CODE}`
pub fn participant_token(session_code: &str) -> String {
    format!("{TOKEN_PREFIX}{}", session_code.to_uppercase())
}

/// `play-join-pref:{CODE}`
pub fn join_preference(session_code: &str) -> String {
    format!("{JOIN_PREF_PREFIX}{}", session_code.to_uppercase())
}

/// `play-chat-read:{sessionId}:{role}:{tokenPrefix}`
pub fn chat_last_read(session_id: Uuid, role: ChatRole, token: Option<&str>) -> String {
    let prefix: String = token
        .unwrap_or("anon")
        .chars()
        .take(TOKEN_KEY_CHARS)
        .collect();
    format!("{CHAT_READ_PREFIX}{session_id}:{}:{prefix}", role.as_str())
}
