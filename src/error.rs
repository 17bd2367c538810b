use std::time::Duration;

use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    api::ApiError,
    dao::storage::StorageError,
    state::{AbortError, ApplyError, PlanError},
};

/// Errors raised by the session services.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The play API call failed.
    #[error("play API request failed")]
    Api(#[from] ApiError),
    /// Local storage could not be used.
    #[error("local storage unavailable")]
    Storage(#[from] StorageError),
    /// Invalid input provided by the user.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// No participant token is held for this session.
    #[error("not joined to session {0}")]
    NotJoined(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<ValidationErrors> for ClientError {
    fn from(err: ValidationErrors) -> Self {
        ClientError::InvalidInput(format!("validation failed: {}", err))
    }
}

impl From<PlanError> for ClientError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ClientError::InvalidState("status change already pending".into())
            }
            PlanError::InvalidTransition(invalid) => ClientError::InvalidState(invalid.to_string()),
        }
    }
}

impl From<ApplyError> for ClientError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => ClientError::InvalidState("no status change is pending".into()),
            ApplyError::IdMismatch { .. } => {
                ClientError::InvalidState("pending status change does not match".into())
            }
            ApplyError::StatusMismatch { expected, actual } => ClientError::InvalidState(format!(
                "status changed during transition (expected {expected:?}, got {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => {
                ClientError::InvalidState(format!(
                    "status version mismatch during transition (expected {expected}, got {actual})"
                ))
            }
        }
    }
}

impl From<AbortError> for ClientError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => ClientError::InvalidState("no pending status change".into()),
            AbortError::IdMismatch { .. } => {
                ClientError::InvalidState("status change plan does not match".into())
            }
        }
    }
}

/// Failure of a single user action, shown inline next to the control that triggered it.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The same action is still waiting for the server.
    #[error("already submitting")]
    InFlight,
    /// The signal channel is cooling down.
    #[error("wait {}ms before signalling again", remaining.as_millis())]
    CoolingDown {
        /// Time left before the channel accepts another signal.
        remaining: Duration,
    },
    /// The input was rejected before any request was made.
    #[error("{0}")]
    Invalid(String),
    /// No participant token is held.
    #[error("join the session first")]
    NotJoined,
    /// The server rejected the action.
    #[error("{message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code.
        code: Option<String>,
        /// Message suitable for display.
        message: String,
    },
    /// The request did not reach the server.
    #[error("network unavailable, try again")]
    Network(#[source] ApiError),
}

impl From<ApiError> for ActionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status {
                status,
                code,
                message,
                ..
            } => ActionError::Rejected {
                status,
                code,
                message,
            },
            ApiError::Decode { status, .. } => ActionError::Rejected {
                status,
                code: None,
                message: "unexpected response from server".into(),
            },
            other => ActionError::Network(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_become_rejections() {
        let err = ActionError::from(ApiError::Status {
            path: "/vote".into(),
            status: 409,
            code: Some("ALREADY_VOTED".into()),
            message: "You already voted".into(),
            retry_after: None,
        });
        assert!(matches!(err, ActionError::Rejected { status: 409, .. }));
        assert_eq!(err.to_string(), "You already voted");
    }

    #[test]
    fn transport_errors_become_network_errors() {
        let err = ActionError::from(ApiError::Timeout {
            path: "/vote".into(),
        });
        assert!(matches!(err, ActionError::Network(_)));
    }
}
