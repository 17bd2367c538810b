use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::{
    sync::{Notify, watch},
    time::{Instant, sleep_until},
};
use tracing::{debug, info};

use crate::{
    services::{
        context::{InFlightGate, SessionContext},
        recovery::RecoveryFlow,
        session_sync::sync_once,
    },
    state::{
        Visibility,
        backoff::{BackoffPolicy, PollBackoff},
    },
};

/// Self-rescheduling poll loop for one session.
pub struct Poller {
    ctx: SessionContext,
    recovery: Arc<RecoveryFlow>,
    policy: BackoffPolicy,
    gate: InFlightGate,
    wake: Notify,
    stopped: AtomicBool,
}

impl Poller {
    /// Build a poller; nothing runs until [`Poller::run`] is spawned.
    pub fn new(ctx: SessionContext, recovery: Arc<RecoveryFlow>, policy: BackoffPolicy) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            recovery,
            policy,
            gate: InFlightGate::new(),
            wake: Notify::new(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Gate shared with manual retries.
    pub fn gate(&self) -> &InFlightGate {
        &self.gate
    }

    /// Request an immediate cycle. Ignored (returns `false`) while one is in flight.
    pub fn poll_now(&self) -> bool {
        if self.is_stopped() || self.gate.is_busy() {
            return false;
        }
        self.wake.notify_one();
        true
    }

    /// Prevent any further scheduling and wake the loop so it exits.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Whether [`Poller::stop`] was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Drive poll cycles until stopped. The first cycle runs immediately.
    pub async fn run(self: Arc<Self>, mut visibility: watch::Receiver<Visibility>) {
        let mut backoff = PollBackoff::new(self.policy.clone());
        let mut next_at = Instant::now();
        let mut watching = true;

        info!(code = %self.ctx.code, "session poller started");

        while !self.is_stopped() {
            if watching && *visibility.borrow_and_update() == Visibility::Hidden {
                debug!(code = %self.ctx.code, "session hidden; poller suspended");
                tokio::select! {
                    changed = visibility.changed() => {
                        if changed.is_err() {
                            watching = false;
                        }
                    }
                    _ = self.wake.notified() => {}
                }
                next_at = Instant::now();
                continue;
            }

            tokio::select! {
                _ = sleep_until(next_at) => {}
                _ = self.wake.notified() => {}
                changed = visibility.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                    }
                    continue;
                }
            }

            if self.is_stopped() {
                break;
            }

            let Some(guard) = self.gate.try_enter() else {
                next_at = Instant::now() + backoff.current();
                continue;
            };
            let report = sync_once(&self.ctx).await;
            let rejoined = self.recovery.after_cycle(&self.ctx).await;
            drop(guard);

            let delay = backoff.next_delay(report.classification, report.retry_after);
            next_at = if rejoined {
                Instant::now()
            } else {
                Instant::now() + delay
            };
            debug!(
                code = %self.ctx.code,
                delay_ms = delay.as_millis() as u64,
                rejoined,
                "next poll scheduled"
            );
        }

        info!(code = %self.ctx.code, "session poller stopped");
    }
}
