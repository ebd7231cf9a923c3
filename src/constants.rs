//! Application-wide constants
//!
//! This module contains the magic numbers and string literals used throughout
//! the daemon, providing a single source of truth for constant values.

/// Configuration file locations
pub mod config {
    /// Directory name under the XDG config/data directories
    pub const APP_DIR: &str = "randr-layoutd";

    /// Config file name inside `APP_DIR`
    pub const FILENAME: &str = "config.json";

    /// Sub-directory of the data directory holding saved layouts
    pub const LAYOUTS_DIR: &str = "layouts";

    /// Environment variable overriding the configured log level
    pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
}

/// xrandr command-line surface
pub mod xrandr {
    /// Default executable, resolved through $PATH
    pub const COMMAND: &str = "xrandr";

    /// Flag producing the report with output properties
    pub const PROPS_FLAG: &str = "--props";

    /// Keywords of the screen header line
    pub const SCREEN: &str = "Screen";
    pub const MINIMUM: &str = "minimum";
    pub const CURRENT: &str = "current";
    pub const MAXIMUM: &str = "maximum";

    /// Output status words
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const PRIMARY: &str = "primary";

    /// The capability list printed after the rotation, in order
    pub const CAPABILITIES: [&str; 8] = [
        "normal", "left", "inverted", "right", "x", "axis", "y", "axis",
    ];
}

/// Persistent state keys
pub mod store {
    /// Key holding the fingerprint believed to be active on the hardware
    pub const KEY_LATEST_LAYOUT: &str = "latest_layout";
}

/// Worker and shutdown timing defaults
pub mod timing {
    /// Hard ceiling on graceful shutdown, in seconds
    pub const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

    /// How often the event subscriber checks for a stop request, in milliseconds
    pub const EVENT_POLL_INTERVAL_MS: u64 = 100;
}

/// Ranges used when validating the config file
pub mod validation {
    pub const MAX_SHUTDOWN_TIMEOUT_SECS: u64 = 60;
    pub const MIN_EVENT_POLL_INTERVAL_MS: u64 = 10;
    pub const MAX_EVENT_POLL_INTERVAL_MS: u64 = 5_000;
}
