//! Error types raised by play API clients.

use std::{error::Error, time::Duration};

use thiserror::Error;

/// Convenient result alias returning [`ApiError`] failures.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures that can occur while talking to the play API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build play API client")]
    ClientBuilder {
        /// Builder error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The request never produced an HTTP response.
    #[error("failed to send request to `{path}`")]
    Network {
        /// Request path relative to the base URL.
        path: String,
        /// Transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No response arrived within the request timeout.
    #[error("request to `{path}` timed out")]
    Timeout {
        /// Request path relative to the base URL.
        path: String,
    },
    /// The server answered with a non-success status.
    #[error("unexpected status {status} for `{path}`: {message}")]
    Status {
        /// Request path relative to the base URL.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Machine-readable code from the error envelope, when present.
        code: Option<String>,
        /// Human-readable message, the envelope's or a generic one.
        message: String,
        /// Parsed `Retry-After` header.
        retry_after: Option<Duration>,
    },
    /// The server answered but the payload could not be decoded.
    #[error("failed to decode response for `{path}` (status {status})")]
    Decode {
        /// Request path relative to the base URL.
        path: String,
        /// HTTP status code of the undecodable response.
        status: u16,
        /// Decoder error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl ApiError {
    /// Build a transport failure from any error source.
    pub fn network(path: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        ApiError::Network {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Build a status failure without server-provided detail.
    pub fn status(path: impl Into<String>, status: u16) -> Self {
        ApiError::Status {
            path: path.into(),
            status,
            code: None,
            message: format!("HTTP {status}"),
            retry_after: None,
        }
    }

    /// HTTP status of the failed response, if one arrived.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } | ApiError::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the request failed below HTTP (no response at all).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ApiError::Network { .. } | ApiError::Timeout { .. } | ApiError::ClientBuilder { .. }
        )
    }

    /// Server-supplied `Retry-After` hint.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Message suitable for an inline action error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Network { .. } | ApiError::Timeout { .. } => {
                "network unavailable, try again".into()
            }
            other => other.to_string(),
        }
    }
}
