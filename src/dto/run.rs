use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a run as tracked by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but not started.
    NotStarted,
    /// Being facilitated.
    InProgress,
    /// Finished normally.
    Completed,
    /// Stopped before the end.
    Abandoned,
}

/// One step of a run timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStep {
    /// Step identifier.
    pub id: String,
    /// Step title.
    pub title: String,
    /// Facilitator notes.
    #[serde(default)]
    pub description: String,
    /// Planned length; drives the step timer.
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    /// Materials to prepare.
    #[serde(default)]
    pub materials: Vec<String>,
    /// Safety notice.
    #[serde(default)]
    pub safety: Option<String>,
    /// Free-form label.
    #[serde(default)]
    pub tag: Option<String>,
    /// Extra note.
    #[serde(default)]
    pub note: Option<String>,
}

/// A started run of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Run identifier.
    pub id: Uuid,
    /// Plan the run was started from.
    pub plan_id: String,
    /// Display name.
    pub name: String,
    /// Server-side status.
    pub status: RunStatus,
    /// Step the server last recorded.
    #[serde(default)]
    pub current_step_index: usize,
    /// Timeline steps.
    #[serde(default)]
    pub steps: Vec<RunStep>,
}

/// Payload of `POST /api/play/{planId}/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunResponse {
    /// The started run.
    pub run: Run,
}

/// Body of `POST /api/play/runs/{runId}/progress`.
///
/// Field order is part of the idempotence check: two payloads are considered equal when their
/// serialised bytes are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    /// Step the facilitator is on.
    pub current_step_index: usize,
    /// Run status to record.
    pub status: RunStatus,
    /// Seconds left on the step timer.
    pub timer_remaining: u32,
    /// Full length of the step timer in seconds.
    pub timer_total: u32,
    /// Whether the timer is counting down.
    pub is_timer_running: bool,
}
