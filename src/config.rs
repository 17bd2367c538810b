//! Client-level configuration loading: poll cadence, timers and local storage location.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::{services::realtime::RealtimeBackoff, state::backoff::BackoffPolicy};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/play-sync.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PLAY_SYNC_CONFIG_PATH";
/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Shortest accepted heartbeat interval.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
/// Shortest accepted realtime reconnect delay.
pub const MIN_REALTIME_DELAY: Duration = Duration::from_millis(100);
/// Largest accepted backoff growth factor.
const MAX_BACKOFF_FACTOR: f64 = 10.0;

/// Timing and storage settings shared by every sync task.
///
/// Durations are written in milliseconds in the JSON file; missing keys keep their default.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Base delay between session polls.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
    /// Upper bound of the poll delay.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_poll_interval: Duration,
    /// Maximum random delay added while offline.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_jitter: Duration,
    /// Delay growth per degraded poll.
    pub degraded_factor: f64,
    /// Delay growth per offline poll.
    pub offline_factor: f64,
    /// Period of the liveness ping.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub heartbeat_interval: Duration,
    /// Quiet period before progress is uploaded.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub progress_debounce: Duration,
    /// `null` waits for host commands indefinitely.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub transition_timeout: Option<Duration>,
    /// First reconnect delay of the realtime feed.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub realtime_initial_delay: Duration,
    /// Upper bound of the realtime reconnect delay.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub realtime_max_delay: Duration,
    /// Per-channel signal cooldown.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub signal_cooldown: Duration,
    /// Random extra cooldown.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub signal_cooldown_jitter: Duration,
    /// Buffered realtime events per subscriber.
    pub signal_hub_capacity: usize,
    /// Directory backing the file local store.
    pub storage_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3_000),
            max_poll_interval: Duration::from_millis(30_000),
            poll_jitter: Duration::from_millis(1_000),
            degraded_factor: 1.5,
            offline_factor: 2.0,
            heartbeat_interval: Duration::from_millis(10_000),
            progress_debounce: Duration::from_millis(800),
            transition_timeout: Some(Duration::from_secs(5)),
            realtime_initial_delay: Duration::from_millis(1_000),
            realtime_max_delay: Duration::from_secs(10),
            signal_cooldown: Duration::from_millis(1_000),
            signal_cooldown_jitter: Duration::from_millis(250),
            signal_hub_capacity: 32,
            storage_dir: PathBuf::from(".play-sync"),
        }
    }
}

impl SyncConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        poll_interval_ms = config.poll_interval.as_millis() as u64,
                        "loaded sync config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Poll backoff tunables, clamped to workable values.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        let base = self.poll_interval.max(MIN_POLL_INTERVAL);
        BackoffPolicy {
            base,
            max: self.max_poll_interval.max(base),
            degraded_factor: clamp_factor(self.degraded_factor, 1.5),
            offline_factor: clamp_factor(self.offline_factor, 2.0),
            jitter_max: self.poll_jitter,
        }
    }

    /// Heartbeat period, never below [`MIN_HEARTBEAT_INTERVAL`].
    pub fn heartbeat_period(&self) -> Duration {
        self.heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL)
    }

    /// Reconnect delays of the realtime supervisor.
    pub fn realtime_backoff(&self) -> RealtimeBackoff {
        let initial = self.realtime_initial_delay.max(MIN_REALTIME_DELAY);
        RealtimeBackoff {
            initial,
            max: self.realtime_max_delay.max(initial),
        }
    }
}

fn clamp_factor(factor: f64, fallback: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(1.0, MAX_BACKOFF_FACTOR)
    } else {
        fallback
    }
}

fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{ "pollInterval": 1500, "transitionTimeout": null }"#).unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(1_500));
        assert_eq!(config.transition_timeout, None);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
    }

    #[test]
    fn backoff_policy_never_shrinks() {
        let config = SyncConfig {
            max_poll_interval: Duration::from_millis(10),
            degraded_factor: 0.5,
            ..Default::default()
        };
        let policy = config.backoff_policy();
        assert_eq!(policy.max, config.poll_interval);
        assert_eq!(policy.degraded_factor, 1.0);
    }

    #[test]
    fn zero_and_oversized_values_are_clamped() {
        let config: SyncConfig = serde_json::from_str(
            r#"{
                "pollInterval": 0,
                "maxPollInterval": 0,
                "heartbeatInterval": 0,
                "realtimeInitialDelay": 0,
                "realtimeMaxDelay": 0,
                "degradedFactor": 1e300,
                "offlineFactor": 1e308
            }"#,
        )
        .unwrap();

        let policy = config.backoff_policy();
        assert_eq!(policy.base, MIN_POLL_INTERVAL);
        assert_eq!(policy.max, MIN_POLL_INTERVAL);
        assert_eq!(policy.degraded_factor, MAX_BACKOFF_FACTOR);
        assert_eq!(policy.offline_factor, MAX_BACKOFF_FACTOR);
        assert_eq!(config.heartbeat_period(), MIN_HEARTBEAT_INTERVAL);

        let realtime = config.realtime_backoff();
        assert_eq!(realtime.initial, MIN_REALTIME_DELAY);
        assert_eq!(realtime.max, MIN_REALTIME_DELAY);
    }

    #[test]
    fn non_finite_factors_fall_back_to_defaults() {
        let config = SyncConfig {
            degraded_factor: f64::NAN,
            offline_factor: f64::INFINITY,
            ..Default::default()
        };
        let policy = config.backoff_policy();
        assert_eq!(policy.degraded_factor, 1.5);
        assert_eq!(policy.offline_factor, 2.0);
    }
}
