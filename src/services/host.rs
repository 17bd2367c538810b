use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    time::timeout,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api::HostApi,
    dto::session::{HostCommand, SessionStatus},
    error::ClientError,
    state::{Plan, SharedSession, Snapshot, lifecycle::SessionLifecycle},
};

/// Host-side driver of the session status.
///
/// Each command is planned locally, sent to the server and then applied, or aborted when the
/// request fails or times out. Commands are serialised on a gate.
pub struct HostController {
    session_id: Uuid,
    api: Arc<dyn HostApi>,
    state: SharedSession,
    lifecycle: RwLock<SessionLifecycle>,
    gate: Mutex<()>,
    command_timeout: Option<Duration>,
}

impl HostController {
    /// Create a controller for a session currently in `status`.
    pub fn new(
        session_id: Uuid,
        status: SessionStatus,
        api: Arc<dyn HostApi>,
        state: SharedSession,
        command_timeout: Option<Duration>,
    ) -> Self {
        Self {
            session_id,
            api,
            state,
            lifecycle: RwLock::new(SessionLifecycle::new(status)),
            gate: Mutex::new(()),
            command_timeout,
        }
    }

    /// Current lifecycle snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.lifecycle.read().await.snapshot()
    }

    /// Adopt a status seen by the poller or the realtime feed.
    pub async fn observe(&self, status: SessionStatus) -> bool {
        self.lifecycle.write().await.observe(status)
    }

    /// Run a host command end to end and return the resulting status.
    ///
    /// The lifecycle first adopts the status last published to the view; an ended or cancelled
    /// session refuses every command without a request.
    pub async fn run_command(&self, command: HostCommand) -> Result<SessionStatus, ClientError> {
        let gate = self.gate.lock().await;
        let Plan { id: plan_id, to, .. } = {
            let mut lifecycle = self.lifecycle.write().await;
            if let Some(published) = self.state.status() {
                lifecycle.observe(published);
            }
            lifecycle.plan(command)?
        };

        let request = self.api.send_command(self.session_id, command);
        let outcome = if let Some(limit) = self.command_timeout {
            match timeout(limit, request).await {
                Ok(result) => result,
                Err(_) => {
                    self.abort(plan_id, command).await;
                    drop(gate);
                    return Err(ClientError::Timeout);
                }
            }
        } else {
            request.await
        };

        match outcome {
            Ok(response) => {
                let next = {
                    let mut lifecycle = self.lifecycle.write().await;
                    settle(&mut lifecycle, plan_id, to, response.status)
                };
                drop(gate);

                let applied = self.state.update_if(|view| {
                    if view.status().is_some_and(SessionStatus::is_terminal) {
                        return false;
                    }
                    view.apply_status(next);
                    true
                });
                if applied {
                    info!(?command, status = ?next, "session status changed");
                } else if let Some(published) = self.state.status() {
                    warn!(?command, reported = ?next, "session already over; status kept");
                    self.observe(published).await;
                }
                Ok(next)
            }
            Err(err) => {
                self.abort(plan_id, command).await;
                drop(gate);
                Err(err.into())
            }
        }
    }

    async fn abort(&self, plan_id: Uuid, command: HostCommand) {
        if let Err(abort_err) = self.lifecycle.write().await.abort(plan_id) {
            warn!(
                ?command,
                plan_id = %plan_id,
                error = ?abort_err,
                "failed to abort status change"
            );
        }
    }
}

/// Apply the accepted plan, then adopt the status the server reported.
///
/// An apply failure is only logged.
fn settle(
    lifecycle: &mut SessionLifecycle,
    plan_id: Uuid,
    expected: SessionStatus,
    reported: SessionStatus,
) -> SessionStatus {
    if let Err(err) = lifecycle.apply(plan_id) {
        warn!(plan_id = %plan_id, error = ?err, "accepted status change no longer applies");
    }
    if reported != expected {
        warn!(?expected, ?reported, "server reported a different status");
    }
    lifecycle.observe(reported);
    lifecycle.status()
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex as StdMutex,
        atomic::{AtomicUsize, Ordering},
    };

    use futures::future::BoxFuture;
    use tokio::time::sleep;

    use super::*;
    use crate::{
        api::{ApiError, ApiResult},
        dto::session::{PlaySession, PublicSessionResponse, SessionCommandResponse},
        state::SessionState,
    };

    #[derive(Default)]
    struct FakeHostApi {
        calls: AtomicUsize,
        fail: StdMutex<bool>,
        delay: Option<Duration>,
    }

    impl HostApi for FakeHostApi {
        fn send_command(
            &self,
            _session_id: Uuid,
            command: HostCommand,
        ) -> BoxFuture<'static, ApiResult<SessionCommandResponse>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = *self.fail.lock().unwrap();
            let delay = self.delay;
            Box::pin(async move {
                if let Some(delay) = delay {
                    sleep(delay).await;
                }
                if fail {
                    return Err(ApiError::status("/status", 500));
                }
                let status = match command {
                    HostCommand::Start | HostCommand::Resume | HostCommand::Unlock => {
                        SessionStatus::Active
                    }
                    HostCommand::Pause => SessionStatus::Paused,
                    HostCommand::Lock => SessionStatus::Locked,
                    HostCommand::End => SessionStatus::Ended,
                    HostCommand::Cancel => SessionStatus::Cancelled,
                };
                Ok(SessionCommandResponse { status })
            })
        }
    }

    fn controller(api: Arc<FakeHostApi>, status: SessionStatus) -> HostController {
        HostController::new(
            Uuid::nil(),
            status,
            api,
            SessionState::new("ABCD"),
            Some(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn start_moves_lobby_to_active() {
        let api = Arc::new(FakeHostApi::default());
        let host = controller(api, SessionStatus::Lobby);

        let status = host.run_command(HostCommand::Start).await.unwrap();
        assert_eq!(status, SessionStatus::Active);

        let snapshot = host.snapshot().await;
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.pending, None);
    }

    #[tokio::test]
    async fn invalid_command_is_rejected_locally() {
        let api = Arc::new(FakeHostApi::default());
        let host = controller(api.clone(), SessionStatus::Lobby);

        let err = host.run_command(HostCommand::Resume).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_request_aborts_the_plan() {
        let api = Arc::new(FakeHostApi::default());
        *api.fail.lock().unwrap() = true;
        let host = controller(api.clone(), SessionStatus::Active);

        let err = host.run_command(HostCommand::Pause).await.unwrap_err();
        assert!(matches!(err, ClientError::Api(_)));

        let snapshot = host.snapshot().await;
        assert_eq!(snapshot.status, SessionStatus::Active);
        assert_eq!(snapshot.pending, None);

        *api.fail.lock().unwrap() = false;
        assert_eq!(
            host.run_command(HostCommand::Pause).await.unwrap(),
            SessionStatus::Paused
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_request_times_out_and_aborts() {
        let api = Arc::new(FakeHostApi {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let host = controller(api, SessionStatus::Active);

        let err = host.run_command(HostCommand::End).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout));
        assert_eq!(host.snapshot().await.pending, None);
        assert_eq!(host.snapshot().await.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn end_marks_overlays_terminal() {
        let api = Arc::new(FakeHostApi::default());
        let host = controller(api, SessionStatus::Paused);

        host.run_command(HostCommand::End).await.unwrap();
        assert!(host.state.read(|view| view.overlays.arbiter.is_terminal()));
    }

    #[tokio::test]
    async fn observed_status_feeds_next_plan() {
        let api = Arc::new(FakeHostApi::default());
        let host = controller(api, SessionStatus::Lobby);

        assert!(host.observe(SessionStatus::Active).await);
        assert_eq!(
            host.run_command(HostCommand::Lock).await.unwrap(),
            SessionStatus::Locked
        );
    }

    fn publish(host: &HostController, status: SessionStatus) {
        let response = PublicSessionResponse {
            session: PlaySession {
                id: Uuid::nil(),
                status,
                display_name: "Treasure hunt".into(),
                session_code: "ABCD".into(),
                participant_count: 0,
                game_id: None,
            },
            participants: Vec::new(),
        };
        host.state
            .update(|view| view.apply_session(response, std::time::SystemTime::now()));
    }

    #[tokio::test]
    async fn ended_view_refuses_commands_without_request() {
        let api = Arc::new(FakeHostApi::default());
        let host = controller(api.clone(), SessionStatus::Active);
        publish(&host, SessionStatus::Ended);

        let err = host.run_command(HostCommand::Pause).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(host.state.status(), Some(SessionStatus::Ended));
        assert_eq!(host.snapshot().await.status, SessionStatus::Ended);
    }

    #[tokio::test]
    async fn published_status_is_adopted_before_planning() {
        let api = Arc::new(FakeHostApi::default());
        let host = controller(api.clone(), SessionStatus::Lobby);
        publish(&host, SessionStatus::Paused);

        assert_eq!(
            host.run_command(HostCommand::Resume).await.unwrap(),
            SessionStatus::Active
        );
        assert_eq!(host.state.status(), Some(SessionStatus::Active));
    }

    #[test]
    fn stale_plan_still_adopts_reported_status() {
        let mut lifecycle = SessionLifecycle::new(SessionStatus::Active);
        let plan = lifecycle.plan(HostCommand::Pause).unwrap();

        let next = settle(
            &mut lifecycle,
            Uuid::new_v4(),
            plan.to,
            SessionStatus::Paused,
        );
        assert_eq!(next, SessionStatus::Active);
        assert!(lifecycle.snapshot().pending.is_some());

        lifecycle.abort(plan.id).unwrap();
        assert_eq!(
            settle(&mut lifecycle, plan.id, plan.to, SessionStatus::Paused),
            SessionStatus::Paused
        );
    }
}
