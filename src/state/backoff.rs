use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::state::connection::{Classification, ConnectionState};

/// Tunables for the poll interval.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after a connected cycle.
    pub base: Duration,
    /// Cap of the grown delay.
    pub max: Duration,
    /// Growth per degraded cycle.
    pub degraded_factor: f64,
    /// Growth per offline cycle.
    pub offline_factor: f64,
    /// Upper bound (exclusive) of the random jitter added while offline.
    pub jitter_max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(3_000),
            max: Duration::from_millis(30_000),
            degraded_factor: 1.5,
            offline_factor: 2.0,
            jitter_max: Duration::from_millis(1_000),
        }
    }
}

/// Adaptive delay between poll cycles.
#[derive(Debug)]
pub struct PollBackoff {
    policy: BackoffPolicy,
    current: Duration,
    rng: StdRng,
}

impl PollBackoff {
    /// Start at the base interval with an OS-seeded jitter source.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_os_rng())
    }

    /// Deterministic variant used by tests.
    pub fn seeded(policy: BackoffPolicy, seed: u64) -> Self {
        Self::with_rng(policy, StdRng::seed_from_u64(seed))
    }

    fn with_rng(policy: BackoffPolicy, rng: StdRng) -> Self {
        let current = policy.base;
        Self {
            policy,
            current,
            rng,
        }
    }

    /// Current delay without advancing.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Drop back to the base interval.
    pub fn reset(&mut self) {
        self.current = self.policy.base;
    }

    /// Compute the delay before the next cycle from the last classification.
    ///
    /// The result is never above `max` and never below a (clamped) `retry_after` hint.
    pub fn next_delay(
        &mut self,
        classification: Classification,
        retry_after: Option<Duration>,
    ) -> Duration {
        let max = self.policy.max;
        let next = match classification {
            Classification::Set(ConnectionState::Connected) => self.policy.base,
            Classification::Set(ConnectionState::Offline) => self
                .grow(self.policy.offline_factor)
                .saturating_add(self.jitter()),
            Classification::Set(ConnectionState::Degraded(_)) | Classification::Retain => {
                self.grow(self.policy.degraded_factor)
            }
        };

        let mut next = next.min(max);
        if let Some(hint) = retry_after {
            next = next.max(hint.min(max));
        }

        self.current = next;
        next
    }

    /// `current * factor`, or `max` when the product is not a valid duration.
    fn grow(&self, factor: f64) -> Duration {
        Duration::try_from_secs_f64(self.current.as_secs_f64() * factor).unwrap_or(self.policy.max)
    }

    fn jitter(&mut self) -> Duration {
        let bound = self.policy.jitter_max.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.random_range(0..bound))
    }
}
