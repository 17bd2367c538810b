/// Adaptive poll delays.
pub mod backoff;
/// Connection classification.
pub mod connection;
/// Host-side status transitions.
pub mod lifecycle;
/// Blocking overlays and drawers.
pub mod overlay;
/// Run cursor and timer.
pub mod run;
mod signals;

use std::{sync::Arc, time::SystemTime};

use indexmap::IndexMap;
use tokio::sync::watch;
use uuid::Uuid;

use crate::dto::{
    participant::Participant,
    session::{LobbyParticipant, PlaySession, PublicSessionResponse, SessionStatus},
};

pub use self::connection::{ConnectionState, ConnectionStatus, DegradedReason};
pub use self::lifecycle::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
pub use self::overlay::{BlockingOverlay, Drawer, OverlayArbiter, OverlayKind, OverlayStack};
pub use self::signals::SignalHub;

/// Shared handle to the published session state.
pub type SharedSession = Arc<SessionState>;

/// Why the participant has to leave the session view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The session (or this participant) no longer exists.
    SessionNotFound,
    /// The stored token was rejected and could not be recovered.
    TokenRejected,
    /// The participant chose to leave.
    Left,
}

/// Whether the embedding UI is currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Shown; polling runs.
    #[default]
    Visible,
    /// Hidden; polling is suspended.
    Hidden,
}

/// Last signal raised in the session, for a transient toast.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedSignal {
    /// Channel the signal was raised on.
    pub channel: String,
    /// Optional note.
    pub message: Option<String>,
    /// Local receive time.
    pub received_at: SystemTime,
}

/// Reconciled view of a live session as published to the UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    /// Join code.
    pub code: String,
    /// Last public session payload.
    pub session: Option<PlaySession>,
    /// Lobby list in server order.
    pub participants: IndexMap<Uuid, LobbyParticipant>,
    /// The participant, once `me` was fetched.
    pub me: Option<Participant>,
    /// Connection classification.
    pub connection: ConnectionStatus,
    /// Blocking overlays and drawers.
    pub overlays: OverlayStack,
    /// Most recent realtime signal.
    pub last_signal: Option<ReceivedSignal>,
    /// Set once the UI must route back to the join entry point.
    pub exit: Option<ExitReason>,
}

impl SessionView {
    /// Last known session status.
    pub fn status(&self) -> Option<SessionStatus> {
        self.session.as_ref().map(|session| session.status)
    }

    /// Adopt a fresh public session payload.
    pub fn apply_session(&mut self, response: PublicSessionResponse, synced_at: SystemTime) {
        self.participants = response
            .participants
            .into_iter()
            .map(|participant| (participant.id, participant))
            .collect();
        self.apply_status(response.session.status);
        self.session = Some(response.session);
        self.connection.mark_synced(synced_at);
    }

    /// Adopt a status change; terminal statuses clear blocking overlays for good.
    pub fn apply_status(&mut self, status: SessionStatus) {
        if let Some(session) = self.session.as_mut() {
            session.status = status;
        }
        if status.is_terminal() {
            self.overlays.arbiter.end_session();
        }
    }

    /// Record the first exit reason; later ones are ignored.
    pub fn request_exit(&mut self, reason: ExitReason) {
        self.exit.get_or_insert(reason);
    }
}

/// Owner of the published [`SessionView`].
///
/// Every mutation goes through the watch channel so readers never observe a torn state.
pub struct SessionState {
    view: watch::Sender<SessionView>,
}

impl SessionState {
    /// Create the state for the session with the given join code.
    pub fn new(code: impl Into<String>) -> SharedSession {
        let (view, _rx) = watch::channel(SessionView {
            code: code.into(),
            ..Default::default()
        });
        Arc::new(Self { view })
    }

    /// Subscribe to view updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// Clone of the current view.
    pub fn snapshot(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Read from the current view without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&SessionView) -> R) -> R {
        f(&self.view.borrow())
    }

    /// Mutate the view and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut SessionView)) {
        self.view.send_modify(f);
    }

    /// Mutate the view, notifying subscribers only when `f` reports a change.
    pub fn update_if(&self, f: impl FnOnce(&mut SessionView) -> bool) -> bool {
        self.view.send_if_modified(f)
    }

    /// Join code of the session.
    pub fn code(&self) -> String {
        self.read(|view| view.code.clone())
    }

    /// Last known session status.
    pub fn status(&self) -> Option<SessionStatus> {
        self.read(SessionView::status)
    }

    /// Whether an exit has been requested.
    pub fn has_exited(&self) -> bool {
        self.read(|view| view.exit.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: SessionStatus) -> PublicSessionResponse {
        PublicSessionResponse {
            session: PlaySession {
                id: Uuid::nil(),
                status,
                display_name: "Treasure hunt".into(),
                session_code: "ABCD".into(),
                participant_count: 1,
                game_id: None,
            },
            participants: vec![LobbyParticipant {
                id: Uuid::nil(),
                display_name: "Ada".into(),
                is_ready: true,
                role: None,
            }],
        }
    }

    #[test]
    fn applying_session_marks_sync_and_indexes_participants() {
        let state = SessionState::new("ABCD");
        let now = SystemTime::now();
        state.update(|view| view.apply_session(response(SessionStatus::Active), now));

        let view = state.snapshot();
        assert_eq!(view.status(), Some(SessionStatus::Active));
        assert_eq!(view.participants.len(), 1);
        assert_eq!(view.connection.last_synced_at, Some(now));
    }

    #[test]
    fn terminal_status_ends_overlays() {
        let state = SessionState::new("ABCD");
        state.update(|view| {
            view.overlays.arbiter.push(BlockingOverlay::Countdown {
                duration_seconds: 10,
                message: None,
            });
            view.apply_session(response(SessionStatus::Ended), SystemTime::now());
        });

        let view = state.snapshot();
        assert!(view.overlays.arbiter.active().is_none());
        assert!(view.overlays.arbiter.is_terminal());
    }

    #[test]
    fn first_exit_reason_wins() {
        let state = SessionState::new("ABCD");
        state.update(|view| view.request_exit(ExitReason::TokenRejected));
        state.update(|view| view.request_exit(ExitReason::Left));
        assert_eq!(state.snapshot().exit, Some(ExitReason::TokenRejected));
    }

    #[tokio::test]
    async fn subscribers_observe_updates() {
        let state = SessionState::new("ABCD");
        let mut rx = state.subscribe();
        state.update(|view| view.connection.mark_connected());
        rx.changed().await.unwrap();
        assert!(!state.update_if(|_| false));
    }
}
