//! Configuration errors
//!
//! This module defines error types for the configuration module. The
//! `Display` output is what a host ultimately shows to the user, so parser
//! messages are carried through unchanged.

use std::fmt;
use std::error::Error;
use std::path::PathBuf;

/// Configuration error type
#[derive(Debug)]
pub enum ConfigError {
    /// File not found
    FileNotFound(PathBuf),

    /// Permission denied when accessing file
    FilePermissionDenied(PathBuf),

    /// Error reading file
    FileReadError(PathBuf, String),

    /// Source contained nothing but whitespace
    Empty(Option<PathBuf>),

    /// Error parsing configuration; holds the parser's message
    ParseError(String),

    /// Invalid value for configuration option
    InvalidValue(String, String),

    /// Two entries of the given kind share a name
    DuplicateName(&'static str, String),

    /// A group or rule references an unknown proxy
    UnknownReference(String, String),

    /// Other error
    Other(String),
}

impl ConfigError {
    /// Build an error from an IO failure on a known path
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path),
            std::io::ErrorKind::PermissionDenied => ConfigError::FilePermissionDenied(path),
            _ => ConfigError::FileReadError(path, err.to_string()),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) =>
                write!(f, "Configuration file not found: {}", path.display()),

            ConfigError::FilePermissionDenied(path) =>
                write!(f, "Permission denied when accessing configuration file: {}", path.display()),

            ConfigError::FileReadError(path, err) =>
                write!(f, "Error reading configuration file {}: {}", path.display(), err),

            ConfigError::Empty(Some(path)) =>
                write!(f, "Configuration file {} is empty", path.display()),

            ConfigError::Empty(None) =>
                write!(f, "Configuration is empty"),

            ConfigError::ParseError(msg) =>
                write!(f, "{}", msg),

            ConfigError::InvalidValue(name, msg) =>
                write!(f, "Invalid value for '{}': {}", name, msg),

            ConfigError::DuplicateName(kind, name) =>
                write!(f, "{} {} is the duplicate name", kind, name),

            ConfigError::UnknownReference(owner, name) =>
                write!(f, "{}: '{}' not found", owner, name),

            ConfigError::Other(msg) =>
                write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ConfigError {}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<serde_yml::Error> for ConfigError {
    fn from(err: serde_yml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
