//! Daemon configuration
//!
//! Loaded once at startup from `$XDG_CONFIG_HOME/randr-layoutd/config.json`.
//! Every field is optional; a missing file means all defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn, Level};

use crate::constants::{config as paths, timing, validation, xrandr};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Executable used for both querying and applying layouts
    #[serde(default = "default_xrandr_command")]
    pub xrandr_command: String,

    /// Where layouts are saved. Defaults to the XDG data directory.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Replay the saved layout when the daemon starts, even if the hardware
    /// has not changed since the last run
    #[serde(default = "default_reapply_on_startup")]
    pub reapply_on_startup: bool,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_event_poll_interval_ms")]
    pub event_poll_interval_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_xrandr_command() -> String {
    xrandr::COMMAND.to_string()
}

fn default_reapply_on_startup() -> bool {
    true
}

fn default_shutdown_timeout_secs() -> u64 {
    timing::SHUTDOWN_TIMEOUT_SECS
}

fn default_event_poll_interval_ms() -> u64 {
    timing::EVENT_POLL_INTERVAL_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            xrandr_command: default_xrandr_command(),
            state_dir: None,
            reapply_on_startup: default_reapply_on_startup(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            event_poll_interval_ms: default_event_poll_interval_ms(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::FILENAME);
        path
    }

    /// Read the config file. Call [`Config::validate_and_clamp`] once logging
    /// is up so corrections are visible.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).context(format!("Failed to read config file {}", path.display()));
            }
        };

        serde_json::from_str(&contents).context(format!("Failed to parse config file {}", path.display()))
    }

    pub fn validate_and_clamp(&mut self) {
        use validation::*;

        if parse_level(&self.log_level).is_none() {
            warn!(log_level = %self.log_level, using = %default_log_level(), "Unknown log_level, using default");
            self.log_level = default_log_level();
        }

        if self.xrandr_command.trim().is_empty() {
            warn!(using = %default_xrandr_command(), "xrandr_command is empty, using default");
            self.xrandr_command = default_xrandr_command();
        }

        if self.shutdown_timeout_secs == 0 {
            warn!(using = default_shutdown_timeout_secs(), "shutdown_timeout_secs is zero, using default");
            self.shutdown_timeout_secs = default_shutdown_timeout_secs();
        } else if self.shutdown_timeout_secs > MAX_SHUTDOWN_TIMEOUT_SECS {
            warn!(shutdown_timeout_secs = self.shutdown_timeout_secs, max = MAX_SHUTDOWN_TIMEOUT_SECS, "shutdown_timeout_secs exceeds maximum, clamping");
            self.shutdown_timeout_secs = MAX_SHUTDOWN_TIMEOUT_SECS;
        }

        if self.event_poll_interval_ms < MIN_EVENT_POLL_INTERVAL_MS {
            warn!(event_poll_interval_ms = self.event_poll_interval_ms, min = MIN_EVENT_POLL_INTERVAL_MS, "event_poll_interval_ms below minimum, clamping");
            self.event_poll_interval_ms = MIN_EVENT_POLL_INTERVAL_MS;
        } else if self.event_poll_interval_ms > MAX_EVENT_POLL_INTERVAL_MS {
            warn!(event_poll_interval_ms = self.event_poll_interval_ms, max = MAX_EVENT_POLL_INTERVAL_MS, "event_poll_interval_ms exceeds maximum, clamping");
            self.event_poll_interval_ms = MAX_EVENT_POLL_INTERVAL_MS;
        }

        if let Some(dir) = &self.state_dir {
            if dir.as_os_str().is_empty() {
                warn!("state_dir is empty, using default");
                self.state_dir = None;
            }
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::LAYOUTS_DIR);
        path
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms)
    }

    pub fn log_summary(&self) {
        info!(
            xrandr_command = %self.xrandr_command,
            state_dir = %self.state_dir().display(),
            reapply_on_startup = self.reapply_on_startup,
            shutdown_timeout_secs = self.shutdown_timeout_secs,
            event_poll_interval_ms = self.event_poll_interval_ms,
            "Loaded config"
        );
    }
}

pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}
