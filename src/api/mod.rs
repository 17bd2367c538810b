//! Client-side seams over the play HTTP API and its realtime channel.
//!
//! Each trait covers one consumer so fakes in tests only implement what they exercise.
//! [`http::HttpPlayApi`] implements all of them on top of `reqwest`.

/// Endpoint and timeout settings.
pub mod config;
/// API error types.
pub mod error;
/// `reqwest` implementation of every seam.
#[cfg(feature = "http-api")]
pub mod http;
/// Event-stream decoding.
pub mod sse;

use futures::{future::BoxFuture, stream::BoxStream};
use uuid::Uuid;

use crate::dto::{
    artifact::{ArtifactsResponse, PuzzleSubmitRequest, PuzzleSubmitResponse},
    chat::{ChatMessage, ChatResponse, SignalRequest},
    decision::{DecisionResults, DecisionsResponse},
    events::PlayEvent,
    participant::{JoinRequest, JoinResponse, MeResponse, ReadyResponse},
    run::{ProgressPayload, StartRunResponse},
    session::{HostCommand, PublicSessionResponse, SessionCommandResponse},
};

pub use self::error::{ApiError, ApiResult};

/// Session and participant endpoints driving the poll cycle, heartbeat and rejoin flow.
pub trait SessionApi: Send + Sync {
    /// Public session payload with the lobby list.
    fn fetch_session(&self, code: &str) -> BoxFuture<'static, ApiResult<PublicSessionResponse>>;
    /// The participant owning `token`.
    fn fetch_me(&self, code: &str, token: &str) -> BoxFuture<'static, ApiResult<MeResponse>>;
    /// Re-attach a stored token to the session.
    fn rejoin(&self, code: &str, token: &str) -> BoxFuture<'static, ApiResult<()>>;
    /// Join as a new participant and receive a token.
    fn join(&self, request: JoinRequest) -> BoxFuture<'static, ApiResult<JoinResponse>>;
    /// Liveness ping.
    fn heartbeat(&self, code: &str, token: &str) -> BoxFuture<'static, ApiResult<()>>;
    /// Set the readiness flag.
    fn set_ready(
        &self,
        code: &str,
        token: &str,
        is_ready: bool,
    ) -> BoxFuture<'static, ApiResult<ReadyResponse>>;
}

/// Run lifecycle and progress endpoints.
pub trait RunApi: Send + Sync {
    /// Start a facilitator run for a plan.
    fn start_run(&self, plan_id: &str) -> BoxFuture<'static, ApiResult<StartRunResponse>>;
    /// Upload the current step and timer.
    fn update_progress(
        &self,
        run_id: Uuid,
        payload: ProgressPayload,
    ) -> BoxFuture<'static, ApiResult<()>>;
    /// Mark the run finished.
    fn complete_run(&self, run_id: Uuid) -> BoxFuture<'static, ApiResult<()>>;
    /// Mark the run abandoned.
    fn abandon_run(&self, run_id: Uuid) -> BoxFuture<'static, ApiResult<()>>;
}

/// Participant interaction endpoints (artifacts, decisions, chat, signals).
pub trait InteractionApi: Send + Sync {
    /// Artifacts visible to the participant.
    fn list_artifacts(
        &self,
        session_id: Uuid,
        token: &str,
    ) -> BoxFuture<'static, ApiResult<ArtifactsResponse>>;
    /// Submit a puzzle answer for an artifact.
    fn submit_puzzle(
        &self,
        session_id: Uuid,
        artifact_id: Uuid,
        token: &str,
        request: PuzzleSubmitRequest,
    ) -> BoxFuture<'static, ApiResult<PuzzleSubmitResponse>>;
    /// Open and closed decisions.
    fn list_decisions(
        &self,
        session_id: Uuid,
        token: &str,
    ) -> BoxFuture<'static, ApiResult<DecisionsResponse>>;
    /// Vote for one option of a decision.
    fn cast_vote(
        &self,
        session_id: Uuid,
        decision_id: Uuid,
        token: &str,
        option_id: Uuid,
    ) -> BoxFuture<'static, ApiResult<()>>;
    /// Tallies of a decision.
    fn decision_results(
        &self,
        session_id: Uuid,
        decision_id: Uuid,
        token: &str,
    ) -> BoxFuture<'static, ApiResult<DecisionResults>>;
    /// Chat history.
    fn list_chat(&self, session_id: Uuid, token: &str) -> BoxFuture<'static, ApiResult<ChatResponse>>;
    /// Post a chat message.
    fn send_chat(
        &self,
        session_id: Uuid,
        token: &str,
        body: String,
    ) -> BoxFuture<'static, ApiResult<ChatMessage>>;
    /// Raise a signal on a channel.
    fn send_signal(
        &self,
        session_id: Uuid,
        token: &str,
        request: SignalRequest,
    ) -> BoxFuture<'static, ApiResult<()>>;
}

/// Host-only session lifecycle command.
pub trait HostApi: Send + Sync {
    /// Apply a lifecycle command; answers with the resulting status.
    fn send_command(
        &self,
        session_id: Uuid,
        command: HostCommand,
    ) -> BoxFuture<'static, ApiResult<SessionCommandResponse>>;
}

/// Stream of decoded play events for one session.
pub type PlayEventStream = BoxStream<'static, ApiResult<PlayEvent>>;

/// Source of realtime play events.
pub trait SignalFeed: Send + Sync {
    /// Open the broadcast channel; the stream ends when the server closes it.
    fn subscribe(&self, code: &str) -> BoxFuture<'static, ApiResult<PlayEventStream>>;
}
