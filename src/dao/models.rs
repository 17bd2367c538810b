use serde::{Deserialize, Serialize};

/// Run progress mirrored to local storage under `play-run:{runId}`.
///
/// Every field is optional on read so that partially written or older records still restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRunProgress {
    /// Step the facilitator was on.
    #[serde(default)]
    pub step_index: Option<i64>,
    /// Seconds left on the step timer.
    #[serde(default)]
    pub remaining_seconds: Option<i64>,
    /// Full length of the step timer.
    #[serde(default)]
    pub timer_total_seconds: Option<i64>,
    /// Whether the timer was running.
    #[serde(default)]
    pub is_running: Option<bool>,
}

/// Whether a participant wants to jump straight into an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPreference {
    /// Enter the session as soon as it is active.
    Join,
    /// Stay on the waiting screen.
    Later,
}

impl JoinPreference {
    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            JoinPreference::Join => "join",
            JoinPreference::Later => "later",
        }
    }

    /// Parse a stored value; anything else is treated as "no preference".
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "join" => Some(JoinPreference::Join),
            "later" => Some(JoinPreference::Later),
            _ => None,
        }
    }
}

/// Last chat message a viewer has seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReadMarker {
    /// RFC 3339 timestamp of the newest message read.
    pub last_read_at: String,
}
