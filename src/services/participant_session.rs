//! Wiring of every background task a participant screen needs.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::WatchStream;
use tracing::info;

#[cfg(feature = "http-api")]
use crate::api::http::HttpPlayApi;
use crate::{
    api::{InteractionApi, SessionApi, SignalFeed},
    config::SyncConfig,
    dao::preferences::Preferences,
    dto::events::PlayEvent,
    services::{
        actions::{ParticipantActions, SignalCooldown},
        context::SessionContext,
        heartbeat,
        poller::Poller,
        realtime,
        recovery::{RecoveryFlow, RetryOutcome, handle_connection_retry},
        signal_applier,
    },
    state::{SessionState, SessionView, SignalHub, Visibility},
};

/// API seams consumed by a participant session.
#[derive(Clone)]
pub struct PlayBackends {
    /// Poll, heartbeat and rejoin endpoints.
    pub session: Arc<dyn SessionApi>,
    /// Participant action endpoints.
    pub interaction: Arc<dyn InteractionApi>,
    /// Realtime event source.
    pub feed: Arc<dyn SignalFeed>,
}

#[cfg(feature = "http-api")]
impl PlayBackends {
    /// Route every seam through one HTTP client.
    pub fn http(api: HttpPlayApi) -> Self {
        let api = Arc::new(api);
        Self {
            session: api.clone(),
            interaction: api.clone(),
            feed: api,
        }
    }
}

/// A running participant session: poller, heartbeat, realtime feed and signal applier.
///
/// Dropping it (or calling [`ParticipantSession::shutdown`]) aborts every task.
pub struct ParticipantSession {
    ctx: SessionContext,
    poller: Arc<Poller>,
    actions: Arc<ParticipantActions>,
    hub: Arc<SignalHub>,
    visibility: watch::Sender<Visibility>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ParticipantSession {
    /// Spawn the session tasks for `code`. Must be called inside a Tokio runtime.
    pub fn start(
        config: &SyncConfig,
        backends: PlayBackends,
        preferences: Preferences,
        code: &str,
    ) -> Self {
        let code = code.trim().to_uppercase();
        let ctx = SessionContext {
            code: code.clone(),
            state: SessionState::new(code.clone()),
            api: backends.session,
            preferences,
        };

        let hub = Arc::new(SignalHub::new(config.signal_hub_capacity));
        let (visibility, visibility_rx) = watch::channel(Visibility::Visible);
        let poller = Poller::new(
            ctx.clone(),
            Arc::new(RecoveryFlow::new()),
            config.backoff_policy(),
        );
        let actions = Arc::new(ParticipantActions::new(
            ctx.clone(),
            backends.interaction,
            SignalCooldown {
                base: config.signal_cooldown,
                jitter: config.signal_cooldown_jitter,
            },
        ));

        // Subscribe before the feed starts so no early event is lost.
        let events = hub.subscribe();
        let tasks = vec![
            tokio::spawn(signal_applier::run(ctx.state.clone(), events)),
            tokio::spawn(poller.clone().run(visibility_rx)),
            tokio::spawn(heartbeat::run(ctx.clone(), config.heartbeat_period())),
            tokio::spawn(realtime::run(
                backends.feed,
                code.clone(),
                hub.clone(),
                config.realtime_backoff(),
            )),
        ];

        info!(%code, "participant session started");

        Self {
            ctx,
            poller,
            actions,
            hub,
            visibility,
            tasks: Mutex::new(tasks),
        }
    }

    /// Join code of the session.
    pub fn code(&self) -> &str {
        &self.ctx.code
    }

    /// Subscribe to the reconciled view.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.ctx.state.subscribe()
    }

    /// The reconciled view as a stream, starting with the current value.
    pub fn view_stream(&self) -> WatchStream<SessionView> {
        WatchStream::new(self.subscribe())
    }

    /// Current reconciled view.
    pub fn snapshot(&self) -> SessionView {
        self.ctx.state.snapshot()
    }

    /// User-triggered actions.
    pub fn actions(&self) -> &Arc<ParticipantActions> {
        &self.actions
    }

    /// Raw realtime events, for UIs that render toasts themselves.
    pub fn events(&self) -> broadcast::Receiver<PlayEvent> {
        self.hub.subscribe()
    }

    /// Report whether the UI is shown. Hidden suspends polling.
    pub fn set_visibility(&self, visibility: Visibility) {
        self.visibility.send_replace(visibility);
    }

    /// Ask for an immediate poll; ignored while one is in flight.
    pub fn poll_now(&self) -> bool {
        self.poller.poll_now()
    }

    /// Manual retry from the connection banner.
    pub async fn retry_connection(&self) -> RetryOutcome {
        handle_connection_retry(&self.ctx, &self.poller).await
    }

    /// Stop scheduling and abort every task.
    pub fn shutdown(&self) {
        self.poller.stop();
        let tasks = std::mem::take(
            &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for task in tasks {
            task.abort();
        }
        info!(code = %self.ctx.code, "participant session stopped");
    }
}

impl Drop for ParticipantSession {
    fn drop(&mut self) {
        self.poller.stop();
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}
