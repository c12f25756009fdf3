//! Error handling module
//!
//! This module defines the error types and result type aliases used in the crate.
//! Every error renders as a plain human-readable message, which is what crosses
//! the FFI boundary.

use thiserror::Error;
use std::io;

use crate::config::ConfigError;

/// Message returned when a configuration parses but defines no proxies
pub const NO_PROXY_MESSAGE: &str = "No proxy found in config";

/// Clash bridge error type
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration could not be loaded or parsed; the loader's message is kept verbatim
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration parsed but contains no proxy definitions
    #[error("{}", NO_PROXY_MESSAGE)]
    NoProxies,

    /// The operating system could not supply a free port
    #[error("failed to allocate a free port: {0}")]
    PortAllocation(#[source] io::Error),

    /// The engine rejected a configuration
    #[error("failed to apply configuration: {0}")]
    Apply(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A call arrived before the core was initialized
    #[error("clash core is not initialized")]
    NotInitialized,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `BridgeError`.
pub type Result<T> = std::result::Result<T, BridgeError>;
