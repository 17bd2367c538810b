use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::dto::session::{HostCommand, SessionStatus};

/// Error returned when a host command cannot be applied from the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {command:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the session was in when the command was requested.
    pub from: SessionStatus,
    /// The rejected command.
    pub command: HostCommand,
}

/// Errors that can occur when planning a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The command is not valid from the current status.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// The status changed since the plan was created.
    StatusMismatch {
        /// Status when the plan was created.
        expected: SessionStatus,
        /// Current status.
        actual: SessionStatus,
    },
    /// The version changed since the plan was created.
    VersionMismatch {
        /// Version when the plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned transition.
pub type PlanId = Uuid;

/// A validated transition that has not been applied yet.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Status the session is currently in.
    pub from: SessionStatus,
    /// Status the session will move to.
    pub to: SessionStatus,
    /// Command that triggered this transition.
    pub command: HostCommand,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current status.
    pub status: SessionStatus,
    /// Number of applied transitions.
    pub version: usize,
    /// Target status of the pending plan, if any.
    pub pending: Option<SessionStatus>,
}

/// Host-side session status machine with optimistic plan/apply/abort.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    status: SessionStatus,
    version: usize,
    pending: Option<Plan>,
}

impl SessionLifecycle {
    /// Start tracking a session in `status`.
    pub fn new(status: SessionStatus) -> Self {
        Self {
            status,
            version: 0,
            pending: None,
        }
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Create a snapshot of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Adopt a status reported by the server (poll or realtime).
    ///
    /// Ignored while a plan is pending so the in-flight command decides the outcome.
    pub fn observe(&mut self, status: SessionStatus) -> bool {
        if self.pending.is_some() || self.status == status {
            return false;
        }
        self.status = status;
        self.version += 1;
        true
    }

    /// Validate `command` against the current status and reserve the transition.
    pub fn plan(&mut self, command: HostCommand) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(command)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.status,
            to: next,
            command,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, returning the new status.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionStatus, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.status != plan.from {
            return Err(ApplyError::StatusMismatch {
                expected: plan.from,
                actual: self.status,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.status = plan.to;
        self.version = plan.version_next;

        Ok(self.status)
    }

    /// Drop a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    fn compute_transition(&self, command: HostCommand) -> Result<SessionStatus, InvalidTransition> {
        use SessionStatus::*;

        let next = match (self.status, command) {
            (Lobby, HostCommand::Start) => Active,
            (Active, HostCommand::Pause) => Paused,
            (Paused, HostCommand::Resume) => Active,
            (Active | Paused, HostCommand::Lock) => Locked,
            (Locked, HostCommand::Unlock) => Active,
            (Lobby | Active | Paused | Locked, HostCommand::End) => Ended,
            (Lobby, HostCommand::Cancel) => Cancelled,
            (from, command) => return Err(InvalidTransition { from, command }),
        };

        Ok(next)
    }
}
