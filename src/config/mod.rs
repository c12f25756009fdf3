//! Configuration module
//!
//! This module holds the configuration data model, the YAML loader and the
//! semantic validator.
//!
//! # Data Flow
//! ```text
//! config.yaml / raw bytes
//!     → loader.rs (parse)
//!     → validator.rs (names, groups, rules)
//!     → Config (owned by the caller until handed to the engine)
//! ```

pub mod defaults;
pub mod error;
pub mod loader;
pub mod types;
pub mod validator;

// Re-export types and traits
pub use self::error::ConfigError;
pub use self::loader::{ConfigLoader, YamlLoader};
pub use self::types::{Config, General, GeneralPatch, GeneralSettings, LogLevel, Mode, ProxyDef, ProxyGroup};
pub use self::validator::validate_config;
