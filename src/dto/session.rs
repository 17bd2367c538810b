use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a play session as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Participants are gathering; the activity has not started.
    Lobby,
    /// The activity is running.
    Active,
    /// The host paused the activity.
    Paused,
    /// The host locked the session (no new joins, interaction frozen).
    Locked,
    /// The session finished normally.
    Ended,
    /// The session was cancelled before it finished.
    Cancelled,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    /// Whether losing the network in this status should be surfaced as `offline`.
    pub fn is_connectivity_relevant(self) -> bool {
        matches!(
            self,
            SessionStatus::Lobby | SessionStatus::Active | SessionStatus::Paused | SessionStatus::Locked
        )
    }

    /// Ended and cancelled sessions never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Ended | SessionStatus::Cancelled)
    }
}

/// Public view of a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySession {
    /// Session identifier.
    pub id: Uuid,
    /// Current status.
    pub status: SessionStatus,
    /// Session title.
    pub display_name: String,
    /// Join code.
    pub session_code: String,
    /// Number of joined participants.
    #[serde(default)]
    pub participant_count: u32,
    /// Game the session plays, if any.
    #[serde(default)]
    pub game_id: Option<Uuid>,
}

/// Participant entry of the public lobby list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyParticipant {
    /// Participant identifier.
    pub id: Uuid,
    /// Name shown in the lobby.
    pub display_name: String,
    /// Readiness flag.
    #[serde(default)]
    pub is_ready: bool,
    /// Assigned role.
    #[serde(default)]
    pub role: Option<String>,
}

/// Payload of `GET /api/play/sessions/{code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSessionResponse {
    /// The session.
    pub session: PlaySession,
    /// Lobby list in join order.
    #[serde(default)]
    pub participants: Vec<LobbyParticipant>,
}

/// Commands a host can issue against the session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostCommand {
    /// Leave the lobby and start the activity.
    Start,
    /// Pause a running activity.
    Pause,
    /// Resume a paused activity.
    Resume,
    /// Freeze the session.
    Lock,
    /// Unfreeze a locked session.
    Unlock,
    /// Finish the session.
    End,
    /// Abandon the session from the lobby.
    Cancel,
}

/// Body of `POST /api/play/sessions/{id}/status`.
#[derive(Debug, Serialize)]
pub struct SessionCommandRequest {
    /// Command to apply.
    pub action: HostCommand,
}

/// Response of a host status command.
#[derive(Debug, Deserialize)]
pub struct SessionCommandResponse {
    /// Status after the command.
    pub status: SessionStatus,
}
