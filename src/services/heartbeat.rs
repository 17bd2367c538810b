use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::{config::MIN_HEARTBEAT_INTERVAL, services::context::SessionContext};

/// Best-effort liveness ping, first beat one `period` after start.
///
/// Beats are skipped while no token is held; failures are only logged.
pub async fn run(ctx: SessionContext, period: Duration) {
    let period = if period < MIN_HEARTBEAT_INTERVAL {
        warn!(
            period_ms = period.as_millis() as u64,
            "heartbeat interval too short; using the minimum"
        );
        MIN_HEARTBEAT_INTERVAL
    } else {
        period
    };
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if ctx.state.has_exited() {
            debug!(code = %ctx.code, "session left; heartbeat stopped");
            break;
        }
        let Some(token) = ctx.token() else {
            continue;
        };
        if let Err(err) = ctx.api.heartbeat(&ctx.code, &token).await {
            debug!(code = %ctx.code, error = %err, "heartbeat failed");
        }
    }
}
