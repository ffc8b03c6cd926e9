//! Application-level configuration: queue pacing, retry backoff and the
//! self-serve elimination cooldown.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the JSON configuration is looked up.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HUNT_RING_BACK_CONFIG_PATH";

/// One notification drained per second by default.
const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(1);
/// Failed deliveries re-enter the queue after 30 seconds by default.
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(30);
/// Participants must wait 5 minutes between self-serve eliminations.
const DEFAULT_ELIMINATION_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    drain_interval: Duration,
    retry_backoff: Duration,
    elimination_cooldown: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
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

    /// Pace of the notification consumer: one delivery per interval.
    pub fn drain_interval(&self) -> Duration {
        self.drain_interval
    }

    /// Delay before a failed delivery is re-queued.
    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    /// Minimum wait between two self-serve eliminations by one participant.
    pub fn elimination_cooldown(&self) -> Duration {
        self.elimination_cooldown
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            drain_interval: DEFAULT_DRAIN_INTERVAL,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            elimination_cooldown: DEFAULT_ELIMINATION_COOLDOWN,
        }
    }
}

/// JSON representation of the configuration file. Every field is optional;
/// missing fields keep their default.
#[derive(Debug, Deserialize)]
struct RawConfig {
    drain_interval_ms: Option<u64>,
    retry_backoff_ms: Option<u64>,
    elimination_cooldown_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            drain_interval: raw
                .drain_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.drain_interval),
            retry_backoff: raw
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            elimination_cooldown: raw
                .elimination_cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.elimination_cooldown),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
