//! Connection classification for the poll cycle.
//!
//! The classifier is a pure function of the fetch outcomes and the last known session status;
//! [`ConnectionStatus`] folds its result into the published state.

use std::time::SystemTime;

use crate::{api::ApiError, dto::session::SessionStatus};

/// Reason attached to a degraded connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DegradedReason {
    /// The participant token was rejected (401/403).
    Auth,
    /// The session or participant no longer exists (404).
    NotFound,
    /// Rate limiting, server errors and other transient failures.
    Temporary,
}

/// Client-local connectivity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// The last cycle fully succeeded.
    #[default]
    Connected,
    /// The server answered, but not everything succeeded.
    Degraded(DegradedReason),
    /// The session endpoint is unreachable at the network level.
    Offline,
}

impl ConnectionState {
    /// Reason attached to a degraded state, if any.
    pub fn degraded_reason(self) -> Option<DegradedReason> {
        match self {
            ConnectionState::Degraded(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Categorised outcome of one HTTP fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A successful response.
    Ok,
    /// The server answered with a failure status (or an undecodable body).
    HttpError {
        /// HTTP status code.
        status: u16,
    },
    /// No HTTP response was received (DNS, refused, reset, timeout).
    NetworkFailure,
}

impl From<&ApiError> for FetchOutcome {
    fn from(err: &ApiError) -> Self {
        match err.http_status() {
            Some(status) => FetchOutcome::HttpError { status },
            None => FetchOutcome::NetworkFailure,
        }
    }
}

impl<T> From<&Result<T, ApiError>> for FetchOutcome {
    fn from(result: &Result<T, ApiError>) -> Self {
        match result {
            Ok(_) => FetchOutcome::Ok,
            Err(err) => err.into(),
        }
    }
}

/// Outcome of the authenticated `me` fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeOutcome {
    /// No token is held, so nothing was fetched. Counts as success.
    Skipped,
    /// The fetch ran with this outcome.
    Fetched(FetchOutcome),
}

/// Result of classifying one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Publish this state.
    Set(ConnectionState),
    /// Keep whatever state was previously published.
    Retain,
}

/// Classify a poll cycle.
///
/// `me` is only consulted when the session fetch succeeded.
pub fn classify(
    session: FetchOutcome,
    me: MeOutcome,
    status: Option<SessionStatus>,
) -> Classification {
    match session {
        FetchOutcome::Ok => match me {
            MeOutcome::Skipped | MeOutcome::Fetched(FetchOutcome::Ok) => {
                Classification::Set(ConnectionState::Connected)
            }
            MeOutcome::Fetched(FetchOutcome::HttpError { status: 401 | 403 }) => {
                Classification::Set(ConnectionState::Degraded(DegradedReason::Auth))
            }
            MeOutcome::Fetched(FetchOutcome::HttpError { status: 404 }) => {
                Classification::Set(ConnectionState::Degraded(DegradedReason::NotFound))
            }
            MeOutcome::Fetched(_) => {
                Classification::Set(ConnectionState::Degraded(DegradedReason::Temporary))
            }
        },
        FetchOutcome::NetworkFailure => {
            if status.is_some_and(SessionStatus::is_connectivity_relevant) {
                Classification::Set(ConnectionState::Offline)
            } else {
                Classification::Retain
            }
        }
        FetchOutcome::HttpError { status: 404 } => {
            Classification::Set(ConnectionState::Degraded(DegradedReason::NotFound))
        }
        FetchOutcome::HttpError { .. } => {
            Classification::Set(ConnectionState::Degraded(DegradedReason::Temporary))
        }
    }
}

/// Connection state plus its bookkeeping, as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    /// Current classification.
    pub state: ConnectionState,
    /// Consecutive offline cycles; reset by any connected or degraded cycle.
    pub reconnect_attempts: u32,
    /// Last time a fresh session payload was received.
    pub last_synced_at: Option<SystemTime>,
}

impl ConnectionStatus {
    /// Fold a classification into the status.
    pub fn record(&mut self, classification: Classification) {
        let Classification::Set(state) = classification else {
            return;
        };
        match state {
            ConnectionState::Offline => {
                self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
            }
            _ => self.reconnect_attempts = 0,
        }
        self.state = state;
    }

    /// Mark the session payload as freshly synced.
    pub fn mark_synced(&mut self, at: SystemTime) {
        self.last_synced_at = Some(at);
    }

    /// Force the connected state, as after a successful manual retry.
    pub fn mark_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
    }
}
