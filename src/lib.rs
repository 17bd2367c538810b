//! Client core for live play sessions: polling, realtime signals, overlays and local persistence.

/// HTTP and realtime seams.
pub mod api;
/// Runtime tunables.
pub mod config;
/// Local persistence.
pub mod dao;
/// Wire types.
pub mod dto;
/// Service-level errors.
pub mod error;
/// Long-running tasks and user flows.
pub mod services;
/// Pure session state and the published view.
pub mod state;
