use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A puzzle or prop handed out during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Artifact identifier.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Kind of artifact, free-form.
    #[serde(default)]
    pub artifact_type: Option<String>,
    /// Faces of the artifact, in display order.
    #[serde(default)]
    pub variants: Vec<ArtifactVariant>,
}

/// A revealed (or still hidden) face of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactVariant {
    /// Variant identifier.
    pub id: Uuid,
    /// Variant title, when it differs from the artifact's.
    #[serde(default)]
    pub title: Option<String>,
    /// Markdown body.
    #[serde(default)]
    pub body: Option<String>,
    /// When the variant was revealed; `None` while hidden.
    #[serde(default)]
    pub revealed_at: Option<String>,
    /// When the host last highlighted the variant.
    #[serde(default)]
    pub highlighted_at: Option<String>,
}

/// Payload of `GET /api/play/sessions/{id}/artifacts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsResponse {
    /// Artifacts visible to the caller.
    pub artifacts: Vec<Artifact>,
}

/// Puzzle flavours accepted by the puzzle endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleType {
    /// Free-text answer.
    Riddle,
    /// Numeric counter.
    Counter,
    /// Several answers in any order.
    MultiAnswer,
    /// Decoded cipher text.
    Cipher,
    /// Scanned QR payload.
    QrGate,
}

/// Body of `POST .../artifacts/{artifactId}/puzzle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleSubmitRequest {
    /// Flavour of the puzzle.
    pub puzzle_type: PuzzleType,
    /// Typed answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Counter action such as `increment`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Scanned item identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

/// Outcome reported for a puzzle submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleStatus {
    /// The answer was right.
    Success,
    /// The answer was wrong.
    Fail,
    /// No attempts are left.
    Locked,
    /// The puzzle was solved earlier.
    AlreadySolved,
    /// The server could not evaluate the answer.
    Error,
}

/// Response of a puzzle submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleSubmitResponse {
    /// Outcome of the submission.
    pub status: PuzzleStatus,
    /// Message for the participant.
    pub message: String,
    /// Whether the puzzle is now solved.
    #[serde(default)]
    pub solved: bool,
    /// Attempts remaining, when limited.
    #[serde(default)]
    pub attempts_left: Option<u32>,
}
