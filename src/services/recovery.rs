//! Rejoin handshake and the manual "retry" branches of the connection banner.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::SystemTime,
};

use tracing::{info, warn};

use crate::{
    services::{context::SessionContext, poller::Poller},
    state::{ConnectionState, DegradedReason, ExitReason},
};

/// What a manual retry ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The participant must leave the session view.
    Exited(ExitReason),
    /// The participant was fetched again; the connection is back to connected.
    Recovered,
    /// The lightweight refetch failed; the next poll will try again.
    StillDegraded,
    /// An immediate poll cycle was requested.
    PollRequested,
    /// A fetch cycle is already in flight; the retry was ignored.
    Busy,
}

/// Fires the rejoin handshake at most once per session.
#[derive(Debug, Default)]
pub struct RecoveryFlow {
    attempted: AtomicBool,
}

impl RecoveryFlow {
    /// Create a flow that has not attempted a rejoin yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consulted after each poll cycle.
    ///
    /// When the session is loaded, a token is stored and no participant resolved, rejoin once.
    /// Returns `true` when the rejoin succeeded and the state should be reloaded right away.
    pub async fn after_cycle(&self, ctx: &SessionContext) -> bool {
        let unresolved = ctx
            .state
            .read(|view| view.session.is_some() && view.me.is_none() && view.exit.is_none());
        if !unresolved {
            return false;
        }
        let Some(token) = ctx.token() else {
            return false;
        };
        if self.attempted.swap(true, Ordering::AcqRel) {
            return false;
        }

        match ctx.api.rejoin(&ctx.code, &token).await {
            Ok(()) => {
                info!(code = %ctx.code, "rejoined session with stored token");
                true
            }
            Err(err) => {
                warn!(code = %ctx.code, error = %err, "rejoin failed; discarding stored token");
                ctx.clear_token();
                false
            }
        }
    }

    /// Whether the one-shot rejoin has fired.
    pub fn attempted(&self) -> bool {
        self.attempted.load(Ordering::Acquire)
    }
}

/// Manual retry from the connection banner, branching on the current connection state.
pub async fn handle_connection_retry(ctx: &SessionContext, poller: &Poller) -> RetryOutcome {
    let state = ctx.state.read(|view| view.connection.state);

    match state {
        ConnectionState::Degraded(DegradedReason::NotFound) => {
            exit(ctx, ExitReason::SessionNotFound)
        }
        ConnectionState::Degraded(DegradedReason::Auth) => {
            let Some(_guard) = poller.gate().try_enter() else {
                return RetryOutcome::Busy;
            };
            let Some(token) = ctx.token() else {
                return exit(ctx, ExitReason::TokenRejected);
            };

            if let Err(err) = ctx.api.rejoin(&ctx.code, &token).await {
                warn!(code = %ctx.code, error = %err, "rejoin after auth failure failed");
                ctx.clear_token();
                return exit(ctx, ExitReason::TokenRejected);
            }
            if refetch_me(ctx, &token).await {
                RetryOutcome::Recovered
            } else {
                ctx.clear_token();
                exit(ctx, ExitReason::TokenRejected)
            }
        }
        ConnectionState::Degraded(DegradedReason::Temporary) => {
            let Some(_guard) = poller.gate().try_enter() else {
                return RetryOutcome::Busy;
            };
            let Some(token) = ctx.token() else {
                return RetryOutcome::StillDegraded;
            };
            if refetch_me(ctx, &token).await {
                RetryOutcome::Recovered
            } else {
                RetryOutcome::StillDegraded
            }
        }
        ConnectionState::Offline | ConnectionState::Connected => {
            ctx.state
                .update(|view| view.connection.reconnect_attempts = 0);
            if poller.poll_now() {
                RetryOutcome::PollRequested
            } else {
                RetryOutcome::Busy
            }
        }
    }
}

async fn refetch_me(ctx: &SessionContext, token: &str) -> bool {
    match ctx.api.fetch_me(&ctx.code, token).await {
        Ok(me) => {
            ctx.state.update(|view| {
                view.me = Some(me.participant);
                view.connection.mark_connected();
                view.connection.mark_synced(SystemTime::now());
            });
            true
        }
        Err(err) => {
            warn!(code = %ctx.code, error = %err, "participant refetch failed");
            false
        }
    }
}

fn exit(ctx: &SessionContext, reason: ExitReason) -> RetryOutcome {
    info!(code = %ctx.code, ?reason, "leaving session view");
    ctx.state.update(|view| view.request_exit(reason));
    RetryOutcome::Exited(reason)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dto::session::{PlaySession, SessionStatus},
        services::testing::{CODE, FakeSessionApi, Reply, context, session_id},
        state::backoff::BackoffPolicy,
    };

    fn poller(ctx: &SessionContext) -> Arc<Poller> {
        Poller::new(ctx.clone(), Arc::new(RecoveryFlow::new()), BackoffPolicy::default())
    }

    fn degrade(ctx: &SessionContext, state: ConnectionState) {
        ctx.state.update(|view| view.connection.state = state);
    }

    fn loaded(ctx: &SessionContext) {
        ctx.state.update(|view| {
            view.session = Some(PlaySession {
                id: session_id(),
                status: SessionStatus::Active,
                display_name: "Night walk".into(),
                session_code: CODE.into(),
                participant_count: 0,
                game_id: None,
            })
        });
    }

    #[tokio::test]
    async fn rejoin_fires_once_and_reports_success() {
        let api = FakeSessionApi::new();
        let ctx = context(api.clone(), true);
        let flow = RecoveryFlow::new();
        loaded(&ctx);

        assert!(flow.after_cycle(&ctx).await);
        assert!(!flow.after_cycle(&ctx).await);
        assert_eq!(FakeSessionApi::calls(&api.rejoin_calls), 1);
    }

    #[tokio::test]
    async fn failed_rejoin_discards_token() {
        let api = FakeSessionApi::new();
        api.queue_rejoin(&[Reply::Status(401)]);
        let ctx = context(api.clone(), true);
        let flow = RecoveryFlow::new();
        loaded(&ctx);

        assert!(!flow.after_cycle(&ctx).await);
        assert!(ctx.token().is_none());
        assert!(flow.attempted());
    }

    #[tokio::test]
    async fn rejoin_needs_loaded_session_and_token() {
        let api = FakeSessionApi::new();
        let flow = RecoveryFlow::new();

        let ctx = context(api.clone(), true);
        assert!(!flow.after_cycle(&ctx).await);

        let ctx = context(api.clone(), false);
        loaded(&ctx);
        assert!(!flow.after_cycle(&ctx).await);
        assert!(!flow.attempted());
    }

    #[tokio::test]
    async fn not_found_exits() {
        let api = FakeSessionApi::new();
        let ctx = context(api.clone(), true);
        degrade(&ctx, ConnectionState::Degraded(DegradedReason::NotFound));

        let outcome = handle_connection_retry(&ctx, &poller(&ctx)).await;
        assert_eq!(outcome, RetryOutcome::Exited(ExitReason::SessionNotFound));
        assert_eq!(ctx.state.snapshot().exit, Some(ExitReason::SessionNotFound));
    }

    #[tokio::test]
    async fn auth_retry_rejoins_then_refetches() {
        let api = FakeSessionApi::new();
        let ctx = context(api.clone(), true);
        degrade(&ctx, ConnectionState::Degraded(DegradedReason::Auth));

        let outcome = handle_connection_retry(&ctx, &poller(&ctx)).await;
        assert_eq!(outcome, RetryOutcome::Recovered);
        let view = ctx.state.snapshot();
        assert_eq!(view.connection.state, ConnectionState::Connected);
        assert!(view.me.is_some());
    }

    #[tokio::test]
    async fn auth_retry_with_rejected_refetch_exits() {
        let api = FakeSessionApi::new();
        api.queue_me(&[Reply::Status(403)]);
        let ctx = context(api.clone(), true);
        degrade(&ctx, ConnectionState::Degraded(DegradedReason::Auth));

        let outcome = handle_connection_retry(&ctx, &poller(&ctx)).await;
        assert_eq!(outcome, RetryOutcome::Exited(ExitReason::TokenRejected));
        assert!(ctx.token().is_none());
    }

    #[tokio::test]
    async fn temporary_retry_only_refetches_me() {
        let api = FakeSessionApi::new();
        api.queue_me(&[Reply::Status(503)]);
        let ctx = context(api.clone(), true);
        degrade(&ctx, ConnectionState::Degraded(DegradedReason::Temporary));
        let poller = poller(&ctx);

        assert_eq!(
            handle_connection_retry(&ctx, &poller).await,
            RetryOutcome::StillDegraded
        );
        assert_eq!(
            handle_connection_retry(&ctx, &poller).await,
            RetryOutcome::Recovered
        );
        assert_eq!(FakeSessionApi::calls(&api.rejoin_calls), 0);
        assert_eq!(FakeSessionApi::calls(&api.session_calls), 0);
    }

    #[tokio::test]
    async fn offline_retry_resets_attempts_and_requests_poll() {
        let api = FakeSessionApi::new();
        let ctx = context(api.clone(), true);
        ctx.state.update(|view| {
            view.connection.state = ConnectionState::Offline;
            view.connection.reconnect_attempts = 4;
        });

        let poller = poller(&ctx);
        assert_eq!(
            handle_connection_retry(&ctx, &poller).await,
            RetryOutcome::PollRequested
        );
        assert_eq!(ctx.state.snapshot().connection.reconnect_attempts, 0);

        let _guard = poller.gate().try_enter().unwrap();
        assert_eq!(
            handle_connection_retry(&ctx, &poller).await,
            RetryOutcome::Busy
        );
    }
}
