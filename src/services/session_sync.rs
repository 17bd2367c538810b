//! One poll cycle: fetch the public session, then the participant, then classify.

use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::{
    api::ApiError,
    services::context::SessionContext,
    state::connection::{Classification, FetchOutcome, MeOutcome, classify},
};

/// What the poller needs to know about a finished cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Connection verdict of the cycle.
    pub classification: Classification,
    /// Largest `Retry-After` hint seen during the cycle.
    pub retry_after: Option<Duration>,
}

/// Run one fetch cycle and fold its outcome into the published state.
pub async fn sync_once(ctx: &SessionContext) -> CycleReport {
    let token = ctx.token();
    let mut retry_after = None;

    let session = ctx.api.fetch_session(&ctx.code).await;
    let session_outcome = FetchOutcome::from(&session);

    let me_outcome = match session {
        Ok(response) => {
            ctx.state
                .update(|view| view.apply_session(response, SystemTime::now()));

            match token {
                None => MeOutcome::Skipped,
                Some(token) => {
                    let me = ctx.api.fetch_me(&ctx.code, &token).await;
                    let outcome = FetchOutcome::from(&me);
                    match me {
                        Ok(me) => ctx.state.update(|view| view.me = Some(me.participant)),
                        Err(err) => {
                            note_failure("me", &err, &mut retry_after);
                            if matches!(outcome, FetchOutcome::HttpError { status: 401 | 403 | 404 }) {
                                ctx.state.update(|view| view.me = None);
                            }
                        }
                    }
                    MeOutcome::Fetched(outcome)
                }
            }
        }
        Err(err) => {
            note_failure("session", &err, &mut retry_after);
            MeOutcome::Skipped
        }
    };

    let status = ctx.state.status();
    let classification = classify(session_outcome, me_outcome, status);
    ctx.state
        .update_if(|view| {
            let before = view.connection.clone();
            view.connection.record(classification);
            view.connection != before
        });

    CycleReport {
        classification,
        retry_after,
    }
}

fn note_failure(what: &str, err: &ApiError, retry_after: &mut Option<Duration>) {
    if err.is_network() {
        debug!(fetch = what, error = %err, "fetch failed at the network level");
    } else {
        warn!(fetch = what, error = %err, "fetch failed");
    }
    if let Some(hint) = err.retry_after() {
        *retry_after = Some(retry_after.map_or(hint, |current| current.max(hint)));
    }
}
