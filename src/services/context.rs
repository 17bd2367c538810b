use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::warn;

use crate::{
    api::SessionApi,
    dao::preferences::Preferences,
    state::SharedSession,
};

/// Handles every session task needs: the published state, the API and local preferences.
#[derive(Clone)]
pub struct SessionContext {
    /// Join code of the session.
    pub code: String,
    /// Published session state.
    pub state: SharedSession,
    /// Session endpoints.
    pub api: Arc<dyn SessionApi>,
    /// Tokens and per-session preferences.
    pub preferences: Preferences,
}

impl SessionContext {
    /// Current participant token. Storage failures read as "no token".
    pub fn token(&self) -> Option<String> {
        match self.preferences.participant_token(&self.code) {
            Ok(token) => token,
            Err(err) => {
                warn!(code = %self.code, error = %err, "failed to read participant token");
                None
            }
        }
    }

    /// Forget the participant token, logging storage failures.
    pub fn clear_token(&self) {
        if let Err(err) = self.preferences.clear_participant_token(&self.code) {
            warn!(code = %self.code, error = %err, "failed to remove participant token");
        }
    }
}

/// Allows at most one fetch cycle at a time.
#[derive(Debug, Default)]
pub struct InFlightGate {
    busy: AtomicBool,
}

impl InFlightGate {
    /// Create an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the gate, or `None` when a cycle is already in flight.
    pub fn try_enter(&self) -> Option<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { gate: self })
    }

    /// Whether a cycle currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the gate on drop.
pub struct InFlightGuard<'a> {
    gate: &'a InFlightGate,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}
