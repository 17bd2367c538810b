/// User-triggered participant actions.
pub mod actions;
/// Unread chat tracking against the local read marker.
pub mod chat;
/// Shared handles and the in-flight gate.
pub mod context;
/// Best-effort liveness ping.
pub mod heartbeat;
/// Host lifecycle commands.
pub mod host;
/// Join flow.
pub mod join;
/// Task wiring of a participant session.
pub mod participant_session;
/// Adaptive session poll loop.
pub mod poller;
/// Local persistence and debounced progress upload.
pub mod progress_sync;
/// Realtime feed supervisor.
pub mod realtime;
/// Token recovery and manual connection retry.
pub mod recovery;
/// Facilitator run timeline.
pub mod run_controller;
/// One session poll cycle.
pub mod session_sync;
/// Realtime events applied to the session view.
pub mod signal_applier;
#[cfg(test)]
mod testing;
