use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::dto::validation::{validate_display_name, validate_session_code};

/// A participant as seen by themselves (`/me`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Participant identifier.
    pub id: Uuid,
    /// Name shown to others.
    pub display_name: String,
    /// Role assigned by the host.
    #[serde(default)]
    pub role: Option<String>,
    /// Readiness flag.
    #[serde(default)]
    pub is_ready: bool,
    /// Turn order position.
    #[serde(default)]
    pub position: Option<u32>,
    /// Whether this participant starts the next round.
    #[serde(default)]
    pub is_next_starter: bool,
}

/// Payload of `GET /api/play/sessions/{code}/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    /// The caller.
    pub participant: Participant,
}

/// Body of the rejoin handshake.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinRequest {
    /// Stored token being re-attached.
    pub participant_token: String,
}

/// Body of `POST /api/play/sessions/{code}/ready`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
    /// Requested readiness.
    pub is_ready: bool,
}

/// Readiness echoed back by the server.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    /// Readiness now recorded.
    pub is_ready: bool,
}

/// Body of `POST /api/play/sessions/join`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Join code, uppercase.
    pub session_code: String,
    /// Requested display name, trimmed.
    pub display_name: String,
}

impl JoinRequest {
    /// Build a join request, normalising the code to uppercase and trimming the name.
    pub fn new(session_code: &str, display_name: &str) -> Self {
        Self {
            session_code: session_code.trim().to_uppercase(),
            display_name: display_name.trim().to_string(),
        }
    }
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_session_code(&self.session_code) {
            errors.add("session_code", e);
        }
        if let Err(e) = validate_display_name(&self.display_name) {
            errors.add("display_name", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Response of a successful join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// Token authenticating later calls.
    pub participant_token: String,
    /// The new participant.
    pub participant: Participant,
}
