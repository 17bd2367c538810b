//! Terminal participant client: joins or resumes a play session and logs the reconciled view.

use std::{env, sync::Arc};

use anyhow::{Context, bail};
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use play_sync::{
    api::{config::ApiConfig, http::HttpPlayApi},
    config::SyncConfig,
    dao::{local_store::FileStore, models::JoinPreference, preferences::Preferences},
    dto::format_system_time,
    services::{
        join::join_session,
        participant_session::{ParticipantSession, PlayBackends},
    },
    state::SessionView,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SyncConfig::load();
    let api_config = ApiConfig::from_env().context("reading API configuration")?;
    let code = env::var("PLAY_SESSION_CODE")
        .context("PLAY_SESSION_CODE must be set")?
        .trim()
        .to_uppercase();

    let store = FileStore::open(config.storage_dir.clone()).context("opening local storage")?;
    let preferences = Preferences::new(Arc::new(store));
    let api = HttpPlayApi::new(api_config).context("building API client")?;

    if let Ok(token) = env::var("PLAY_PARTICIPANT_TOKEN") {
        preferences
            .store_participant_token(&code, &token)
            .context("storing participant token")?;
    } else if preferences.participant_token(&code)?.is_none() {
        let Ok(name) = env::var("PLAY_DISPLAY_NAME") else {
            bail!("no stored token for {code}; set PLAY_PARTICIPANT_TOKEN or PLAY_DISPLAY_NAME");
        };
        let participant = join_session(
            &api,
            &preferences,
            &code,
            &name,
            Some(JoinPreference::Join),
        )
        .await
        .context("joining session")?;
        info!(participant_id = %participant.id, "joined as {}", participant.display_name);
    }

    let session = ParticipantSession::start(&config, PlayBackends::http(api), preferences, &code);
    tokio::select! {
        _ = log_view_changes(session.view_stream()) => {},
        _ = shutdown_signal() => info!("shutdown requested"),
    }

    session.shutdown();
    Ok(())
}

/// Log every published view until the session asks the user to leave.
async fn log_view_changes(mut views: WatchStream<SessionView>) {
    while let Some(current) = views.next().await {
        info!(
            status = ?current.status(),
            connection = ?current.connection.state,
            reconnect_attempts = current.connection.reconnect_attempts,
            last_synced_at = %current
                .connection
                .last_synced_at
                .map(format_system_time)
                .unwrap_or_default(),
            participants = current.participants.len(),
            overlay = ?current.overlays.arbiter.active(),
            "session view updated"
        );
        if let Some(signal) = &current.last_signal {
            info!(channel = %signal.channel, message = ?signal.message, "signal received");
        }
        if let Some(reason) = current.exit {
            warn!(?reason, "leaving session");
            break;
        }
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,play_sync=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
