//! Device and relay configuration loaded from a JSON file with environment overrides.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the binaries look for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/courtside.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_CONFIG_PATH";
/// Environment variable that overrides the relay URL (an empty value disables it).
const RELAY_URL_ENV: &str = "COURTSIDE_RELAY_URL";
/// Environment variable that overrides the data directory.
const DATA_DIR_ENV: &str = "COURTSIDE_DATA_DIR";
/// Directory holding the local store when none is configured.
const DEFAULT_DATA_DIR: &str = ".courtside";
/// Poll period of the local-only transport.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration, read once at startup.
pub struct AppConfig {
    /// Base URL of the relay; the remote transport is used only when set.
    pub relay_url: Option<String>,
    /// Directory of the device-local store.
    pub data_dir: PathBuf,
    /// Re-read period of the local-only transport.
    pub poll_interval: Duration,
    /// Base URL of the display page; pairing codes carry a URL when set, the bare id otherwise.
    pub display_url: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to defaults, then apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        relay = config.relay_url.is_some(),
                        "loaded configuration"
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
        };

        config.with_overrides(env::var(RELAY_URL_ENV).ok(), env::var_os(DATA_DIR_ENV))
    }

    fn with_overrides(
        mut self,
        relay_url: Option<String>,
        data_dir: Option<std::ffi::OsString>,
    ) -> Self {
        if let Some(url) = relay_url {
            self.relay_url = non_empty(url);
        }
        if let Some(dir) = data_dir.filter(|dir| !dir.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            poll_interval: DEFAULT_POLL_INTERVAL,
            display_url: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    relay_url: Option<String>,
    data_dir: Option<PathBuf>,
    poll_interval_ms: Option<u64>,
    display_url: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            relay_url: value.relay_url.and_then(non_empty),
            data_dir: value.data_dir.unwrap_or(defaults.data_dir),
            poll_interval: value
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            display_url: value.display_url.and_then(non_empty),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
