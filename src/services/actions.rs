//! User-triggered participant actions. Failures are scoped to the action that raised them.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use dashmap::{DashMap, DashSet, mapref::entry::Entry};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api::InteractionApi,
    dto::{
        artifact::{Artifact, PuzzleSubmitRequest, PuzzleSubmitResponse},
        chat::{ChatMessage, SignalRequest},
        decision::{Decision, DecisionResults},
    },
    error::ActionError,
    services::context::SessionContext,
    state::{BlockingOverlay, Drawer, ExitReason, OverlayKind},
};

/// Longest chat message accepted.
const MAX_CHAT_CHARS: usize = 500;

/// Per-channel signal cooldown.
#[derive(Debug, Clone, Copy)]
pub struct SignalCooldown {
    /// Fixed part of the cooldown.
    pub base: Duration,
    /// Upper bound (exclusive) of the random extra wait.
    pub jitter: Duration,
}

impl Default for SignalCooldown {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1_000),
            jitter: Duration::ZERO,
        }
    }
}

/// Action surface exposed to the participant UI.
pub struct ParticipantActions {
    ctx: SessionContext,
    api: Arc<dyn InteractionApi>,
    votes_in_flight: DashSet<Uuid>,
    cooldowns: DashMap<String, Instant>,
    cooldown: SignalCooldown,
    rng: Mutex<StdRng>,
}

struct VoteGuard<'a> {
    in_flight: &'a DashSet<Uuid>,
    decision_id: Uuid,
}

impl Drop for VoteGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.decision_id);
    }
}

impl ParticipantActions {
    /// Create the action surface for a session.
    pub fn new(
        ctx: SessionContext,
        api: Arc<dyn InteractionApi>,
        cooldown: SignalCooldown,
    ) -> Self {
        Self {
            ctx,
            api,
            votes_in_flight: DashSet::new(),
            cooldowns: DashMap::new(),
            cooldown,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    fn token(&self) -> Result<String, ActionError> {
        self.ctx.token().ok_or(ActionError::NotJoined)
    }

    fn session_id(&self) -> Result<Uuid, ActionError> {
        self.ctx
            .state
            .read(|view| view.session.as_ref().map(|session| session.id))
            .ok_or_else(|| ActionError::Invalid("session not loaded yet".into()))
    }

    /// Cast a vote. A second vote on the same decision while the first is pending is rejected
    /// without a request.
    pub async fn vote(&self, decision_id: Uuid, option_id: Uuid) -> Result<(), ActionError> {
        let token = self.token()?;
        let session_id = self.session_id()?;

        if !self.votes_in_flight.insert(decision_id) {
            return Err(ActionError::InFlight);
        }
        let _guard = VoteGuard {
            in_flight: &self.votes_in_flight,
            decision_id,
        };

        self.api
            .cast_vote(session_id, decision_id, &token, option_id)
            .await?;
        info!(%decision_id, "vote cast");

        self.ctx.state.update(|view| {
            let active = view.overlays.arbiter.active();
            if matches!(active, Some(BlockingOverlay::Decision { decision_id: id, .. }) if *id == decision_id)
            {
                view.overlays.arbiter.complete(OverlayKind::Decision);
            }
        });
        Ok(())
    }

    /// Decisions visible to this participant.
    pub async fn decisions(&self) -> Result<Vec<Decision>, ActionError> {
        let token = self.token()?;
        let session_id = self.session_id()?;
        Ok(self.api.list_decisions(session_id, &token).await?.decisions)
    }

    /// Tally of a revealed decision.
    pub async fn decision_results(&self, decision_id: Uuid) -> Result<DecisionResults, ActionError> {
        let token = self.token()?;
        let session_id = self.session_id()?;
        Ok(self
            .api
            .decision_results(session_id, decision_id, &token)
            .await?)
    }

    /// Artifacts revealed to this participant.
    pub async fn artifacts(&self) -> Result<Vec<Artifact>, ActionError> {
        let token = self.token()?;
        let session_id = self.session_id()?;
        Ok(self.api.list_artifacts(session_id, &token).await?.artifacts)
    }

    /// Submit a puzzle answer or action for an artifact.
    pub async fn submit_puzzle(
        &self,
        artifact_id: Uuid,
        request: PuzzleSubmitRequest,
    ) -> Result<PuzzleSubmitResponse, ActionError> {
        let token = self.token()?;
        let session_id = self.session_id()?;
        Ok(self
            .api
            .submit_puzzle(session_id, artifact_id, &token, request)
            .await?)
    }

    /// Set this participant's readiness.
    pub async fn set_ready(&self, is_ready: bool) -> Result<bool, ActionError> {
        let token = self.token()?;
        let response = self
            .ctx
            .api
            .set_ready(&self.ctx.code, &token, is_ready)
            .await?;

        self.ctx.state.update(|view| {
            if let Some(me) = view.me.as_mut() {
                me.is_ready = response.is_ready;
                if let Some(entry) = view.participants.get_mut(&me.id) {
                    entry.is_ready = response.is_ready;
                }
            }
        });
        Ok(response.is_ready)
    }

    /// Flip readiness.
    pub async fn toggle_ready(&self) -> Result<bool, ActionError> {
        let current = self
            .ctx
            .state
            .read(|view| view.me.as_ref().is_some_and(|me| me.is_ready));
        self.set_ready(!current).await
    }

    /// Chat history of the session.
    pub async fn chat(&self) -> Result<Vec<ChatMessage>, ActionError> {
        let token = self.token()?;
        let session_id = self.session_id()?;
        Ok(self.api.list_chat(session_id, &token).await?.messages)
    }

    /// Send a chat message.
    pub async fn send_chat(&self, body: &str) -> Result<ChatMessage, ActionError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ActionError::Invalid("message is empty".into()));
        }
        if body.chars().count() > MAX_CHAT_CHARS {
            return Err(ActionError::Invalid(format!(
                "message is longer than {MAX_CHAT_CHARS} characters"
            )));
        }
        let token = self.token()?;
        let session_id = self.session_id()?;
        Ok(self
            .api
            .send_chat(session_id, &token, body.to_string())
            .await?)
    }

    /// Raise a signal on `channel`, subject to a per-channel cooldown.
    pub async fn send_signal(
        &self,
        channel: &str,
        message: Option<String>,
    ) -> Result<(), ActionError> {
        let token = self.token()?;
        let session_id = self.session_id()?;

        let now = Instant::now();
        let length = self.cooldown_length();
        match self.cooldowns.entry(channel.to_string()) {
            Entry::Occupied(entry) if now < *entry.get() => {
                return Err(ActionError::CoolingDown {
                    remaining: *entry.get() - now,
                });
            }
            Entry::Occupied(mut entry) => {
                entry.insert(now + length);
            }
            Entry::Vacant(entry) => {
                entry.insert(now + length);
            }
        }

        let request = SignalRequest {
            channel: channel.to_string(),
            message,
        };
        if let Err(err) = self.api.send_signal(session_id, &token, request).await {
            warn!(channel, error = %err, "signal failed");
            return Err(err.into());
        }
        Ok(())
    }

    fn cooldown_length(&self) -> Duration {
        let jitter_ms = self.cooldown.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.cooldown.base;
        }
        let extra = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..jitter_ms);
        self.cooldown.base + Duration::from_millis(extra)
    }

    /// The participant closed the story overlay.
    pub fn dismiss_story(&self) {
        self.ctx
            .state
            .update(|view| {
                view.overlays.arbiter.complete(OverlayKind::Story);
            });
    }

    /// The countdown overlay reached zero.
    pub fn finish_countdown(&self) {
        self.ctx
            .state
            .update(|view| {
                view.overlays.arbiter.complete(OverlayKind::Countdown);
            });
    }

    /// Open or close a drawer.
    pub fn toggle_drawer(&self, drawer: Drawer) {
        self.ctx
            .state
            .update(|view| view.overlays.toggle_drawer(drawer));
    }

    /// Close any open drawer.
    pub fn close_drawer(&self) {
        self.ctx.state.update(|view| view.overlays.close_drawer());
    }

    /// Leave the session: forget the token and route back to the join entry point.
    pub fn leave(&self) {
        self.ctx.clear_token();
        self.ctx
            .state
            .update(|view| view.request_exit(ExitReason::Left));
    }
}
