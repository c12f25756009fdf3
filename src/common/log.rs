//! Logger initialization
//!
//! The host may call the initializer more than once over the lifetime of a
//! process, so installing the logger is idempotent.

use log::LevelFilter;

use crate::config::LogLevel;

/// Initialize the logging system
///
/// When `RUST_LOG` is set it filters as usual. Otherwise the logger itself
/// lets every record through and the global maximum level, starting at
/// `level` and later moved by [`apply_level`], decides what is written.
/// Returns `false` when a logger was already installed.
///
/// # Parameters
///
/// * `level` - Log level used when `RUST_LOG` is not set
pub fn init_logger(level: &str) -> bool {
    let from_env = std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some();

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if !from_env {
        builder.filter_level(LevelFilter::Trace);
    }

    let installed = builder.format_timestamp_millis().try_init().is_ok();
    if installed && !from_env {
        log::set_max_level(level.parse().unwrap_or(LevelFilter::Info));
    }
    installed
}

/// Map a configured log level onto the `log` facade
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Warning => LevelFilter::Warn,
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Silent => LevelFilter::Off,
    }
}

/// Apply a configured log level to the global logger
pub fn apply_level(level: LogLevel) {
    let filter = level_filter(level);
    log::set_max_level(filter);
    log::debug!("Log level set to {}", filter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice() {
        // Another test may already have installed a logger; the second call
        // must never panic and must report that nothing was installed.
        init_logger("debug");
        assert!(!init_logger("info"));
    }

    #[test]
    fn test_configured_level_raises_verbosity() {
        if std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some() {
            return;
        }
        init_logger("info");

        apply_level(LogLevel::Debug);
        let debug = log::Metadata::builder()
            .level(log::Level::Debug)
            .target("clash_bridge")
            .build();
        assert!(log::logger().enabled(&debug));
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(LogLevel::Silent), LevelFilter::Off);
        assert_eq!(level_filter(LogLevel::Warning), LevelFilter::Warn);
        assert_eq!(level_filter(LogLevel::Debug), LevelFilter::Debug);
    }
}
