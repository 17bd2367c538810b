//! Wire types exchanged with the play HTTP API and the realtime channel.

use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Artifacts and puzzle submissions.
pub mod artifact;
/// Chat messages and signals.
pub mod chat;
/// Group decisions and votes.
pub mod decision;
/// Error envelope returned by the API.
pub mod error;
/// Realtime play events.
pub mod events;
/// Participants, join and readiness.
pub mod participant;
/// Facilitator runs and progress.
pub mod run;
/// Public session payloads and host commands.
pub mod session;
/// Validation helpers.
pub mod validation;

/// Render a wall-clock timestamp as RFC 3339.
pub fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
