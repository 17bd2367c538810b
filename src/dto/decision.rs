use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A selectable option within a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOption {
    /// Option identifier.
    pub id: Uuid,
    /// Option label.
    pub label: String,
}

/// A decision the host opened for a vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Decision identifier.
    pub id: Uuid,
    /// Decision title.
    pub title: String,
    /// Question shown to voters.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Voting status.
    pub status: DecisionStatus,
    /// Options to vote for.
    #[serde(default)]
    pub options: Vec<DecisionOption>,
    /// Blocking decisions take over the participant screen until voted.
    #[serde(default)]
    pub blocking: bool,
    /// Whether the caller already voted.
    #[serde(default)]
    pub has_voted: bool,
}

/// Whether a decision still accepts votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// Prepared but not shown.
    Draft,
    /// Accepting votes.
    Open,
    /// Voting ended.
    Closed,
    /// Results are shown.
    Revealed,
}

/// Payload of `GET /api/play/sessions/{id}/decisions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionsResponse {
    /// Decisions of the session.
    pub decisions: Vec<Decision>,
}

/// Body of `POST .../decisions/{id}/vote`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// Chosen option.
    pub option_id: Uuid,
}

/// Tally of a single option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    /// Option identifier.
    pub option_id: Uuid,
    /// Option label.
    pub label: String,
    /// Votes cast for the option.
    pub votes: u32,
}

/// Payload of `GET .../decisions/{id}/results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResults {
    /// Decision identifier.
    pub decision_id: Uuid,
    /// Per-option tallies.
    pub results: Vec<OptionTally>,
    /// Votes cast overall.
    pub total_votes: u32,
}
