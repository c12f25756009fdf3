//! Default configuration values
//!
//! This module provides default values for configuration options.
//! It is the single source of truth for defaults, file names and
//! well-known locations.

use std::path::PathBuf;

use super::types::{LogLevel, Mode};

/// Environment variable overriding the home configuration directory
pub const HOME_DIR_ENV: &str = "CLASH_HOME_DIR";

/// Configuration directory relative to the user's home directory
pub const HOME_CONFIG_DIR: &str = ".config/clash";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// GeoIP database file name
pub const MMDB_FILE: &str = "Country.mmdb";

/// Address resolved when checking that the GeoIP database is usable
pub const GEOIP_TEST_IP: &str = "114.114.114.114";

/// Host part of a repaired controller address
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Marker string returned across the FFI boundary on success
pub const SUCCESS: &str = "success";

/// Default bind address ("*" means all interfaces)
pub fn bind_address() -> String {
    "*".to_string()
}

/// Default proxy mode
pub fn mode() -> Mode {
    Mode::Rule
}

/// Default log level
pub fn log_level() -> LogLevel {
    LogLevel::Info
}

/// Platform home directory, if one can be determined
pub fn user_home() -> Option<PathBuf> {
    #[cfg(windows)]
    let var = "USERPROFILE";
    #[cfg(not(windows))]
    let var = "HOME";

    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Home configuration directory
///
/// `CLASH_HOME_DIR` wins; otherwise `~/.config/clash`.
pub fn home_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    user_home().map(|home| home.join(HOME_CONFIG_DIR))
}
