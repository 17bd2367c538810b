use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{api::SignalFeed, state::SignalHub};

/// Reconnect delays of the realtime supervisor.
#[derive(Debug, Clone, Copy)]
pub struct RealtimeBackoff {
    /// Delay before the first reconnect.
    pub initial: Duration,
    /// Cap of the doubling delay.
    pub max: Duration,
}

impl Default for RealtimeBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1_000),
            max: Duration::from_secs(10),
        }
    }
}

/// Keep the realtime channel of `code` open, forwarding every play event into `hub`.
///
/// Runs until aborted; a closed or failed stream is reopened with exponential backoff.
pub async fn run(
    feed: Arc<dyn SignalFeed>,
    code: String,
    hub: Arc<SignalHub>,
    backoff: RealtimeBackoff,
) {
    let mut delay = backoff.initial;

    loop {
        match feed.subscribe(&code).await {
            Ok(mut events) => {
                info!(%code, "realtime channel connected");
                delay = backoff.initial;

                while let Some(event) = events.next().await {
                    match event {
                        Ok(event) => {
                            debug!(%code, ?event, "play event received");
                            hub.broadcast(event);
                        }
                        Err(err) => {
                            warn!(%code, error = %err, "realtime channel failed");
                            break;
                        }
                    }
                }

                warn!(%code, "realtime channel closed; reconnecting");
            }
            Err(err) => {
                warn!(%code, error = %err, "realtime connection attempt failed");
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(backoff.max);
    }
}
